//! Value normalization for extracted captures.
//!
//! Every normalizer is deterministic. Numeric, date, email and digit
//! normalizers fail closed: a capture they cannot parse is rejected rather
//! than passed through.

use std::str::FromStr;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::profile::FieldValue;

lazy_static! {
    static ref EMAIL_SHAPE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap();

    static ref DECIMAL_SHAPE: Regex = Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").unwrap();

    static ref LIST_MARKER: Regex = Regex::new(r"^(?:[-*•]|\d+[.)])\s*").unwrap();
}

/// Currency symbols stripped before decimal parsing.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];

/// Accepted date layouts, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn default_min_digits() -> usize {
    7
}

/// Type-specific normalization applied to a pattern's capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalizer {
    /// Trimmed text with internal whitespace collapsed.
    Text,
    /// Text as above, upper-cased (state and country codes).
    Upper,
    /// An email address.
    Email,
    /// Digits only, keeping a leading `+`.
    Digits {
        #[serde(default = "default_min_digits")]
        min_digits: usize,
    },
    /// A decimal number, currency symbols stripped.
    Decimal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Decimal>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Decimal>,
    },
    /// An integer, thousands separators stripped.
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// A calendar date.
    Date,
    /// A bulleted or numbered list, items joined by `"; "`.
    List,
}

impl Normalizer {
    /// Normalize a raw capture, or explain why it was rejected.
    pub fn apply(&self, raw: &str) -> Result<FieldValue, String> {
        match self {
            Self::Text => normalize_text(raw).map(FieldValue::Text),
            Self::Upper => normalize_text(raw).map(|s| FieldValue::Text(s.to_uppercase())),
            Self::Email => normalize_email(raw).map(FieldValue::Text),
            Self::Digits { min_digits } => normalize_digits(raw, *min_digits).map(FieldValue::Text),
            Self::Decimal { min, max } => {
                let value = parse_decimal(raw)?;
                check_bounds(value, *min, *max)?;
                Ok(FieldValue::Decimal(value))
            }
            Self::Integer { min, max } => {
                let value = parse_integer(raw)?;
                check_bounds(value, *min, *max)?;
                Ok(FieldValue::Integer(value))
            }
            Self::Date => parse_date(raw).map(FieldValue::Date),
            Self::List => normalize_list(raw).map(FieldValue::Text),
        }
    }
}

fn normalize_text(raw: &str) -> Result<String, String> {
    let text = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ';'])
        .trim_end()
        .to_string();

    if text.is_empty() {
        return Err("empty value".to_string());
    }
    Ok(text)
}

fn normalize_email(raw: &str) -> Result<String, String> {
    let email = raw
        .trim()
        .trim_start_matches(['<', '('])
        .trim_end_matches(['.', ',', ';', ':', '>', ')']);

    if EMAIL_SHAPE.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(format!("not an email address: {:?}", raw))
    }
}

fn normalize_digits(raw: &str, min_digits: usize) -> Result<String, String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < min_digits || digits.len() > 15 {
        return Err(format!("expected {}-15 digits, got {}", min_digits, digits.len()));
    }

    if trimmed.starts_with('+') {
        Ok(format!("+{}", digits))
    } else {
        Ok(digits)
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches(['.', ',', ';'])
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    // A lone comma is a decimal separator ("3,85").
    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };

    if !DECIMAL_SHAPE.is_match(&normalized) {
        return Err(format!("not a number: {:?}", raw));
    }

    Decimal::from_str(&normalized).map_err(|e| format!("not a number: {:?} ({})", raw, e))
}

fn parse_integer(raw: &str) -> Result<i64, String> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches(['.', ',', ';'])
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("not an integer: {:?}", raw));
    }

    cleaned
        .parse::<i64>()
        .map_err(|e| format!("not an integer: {:?} ({})", raw, e))
}

fn check_bounds<T>(value: T, min: Option<T>, max: Option<T>) -> Result<(), String>
where
    T: PartialOrd + std::fmt::Display,
{
    if let Some(min) = min {
        if value < min {
            return Err(format!("{} is below the minimum {}", value, min));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(format!("{} is above the maximum {}", value, max));
        }
    }
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let cleaned = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_end_matches(['.', ',', ';']);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
        .ok_or_else(|| format!("not a date: {:?}", raw))
}

fn normalize_list(raw: &str) -> Result<String, String> {
    let items: Vec<String> = raw
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Err("empty list".to_string());
    }
    Ok(items.join("; "))
}
