//! Extracted student profile.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::field::CanonicalField;

/// A normalized scalar value.
///
/// Serialized with its kind so that text such as `"02134"` reads back as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Integer(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Bare JSON form for display: numbers as numbers, dates and text as strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Decimal(d) => serde_json::Number::from_str(&d.to_string())
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(d.to_string())),
            Self::Date(_) | Self::Text(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

/// Values render the way a form expects them typed (ISO dates).
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One extracted field with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// Normalized value.
    pub value: FieldValue,
    /// Rule identifier, `<field>/<pattern name>`.
    pub rule: String,
    /// Name of the source that produced the value.
    pub source: String,
    /// Raw text the pattern captured.
    pub matched: String,
}

/// A pattern matched but its capture failed normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationRejection {
    pub field: CanonicalField,
    pub rule: String,
    pub source: String,
    pub matched: String,
    pub reason: String,
}

/// Canonical field → value mapping produced by extraction.
///
/// Immutable once built; absence of a field is the normal signal that the
/// source text did not contain it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedProfile {
    fields: BTreeMap<CanonicalField, ExtractedField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rejections: Vec<NormalizationRejection>,
}

impl ExtractedProfile {
    pub(crate) fn from_parts(
        fields: BTreeMap<CanonicalField, ExtractedField>,
        rejections: Vec<NormalizationRejection>,
    ) -> Self {
        Self { fields, rejections }
    }

    pub(crate) fn without_rejections(self) -> Self {
        Self {
            fields: self.fields,
            rejections: Vec::new(),
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&ExtractedField> {
        self.fields.get(&field)
    }

    pub fn value(&self, field: CanonicalField) -> Option<&FieldValue> {
        self.fields.get(&field).map(|f| &f.value)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Fields in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &ExtractedField)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn rejections(&self) -> &[NormalizationRejection] {
        &self.rejections
    }

    /// Plain field → value map, as handed to persistence.
    pub fn values(&self) -> BTreeMap<CanonicalField, FieldValue> {
        self.fields
            .iter()
            .map(|(k, v)| (*k, v.value.clone()))
            .collect()
    }

    /// Field → bare JSON value, for human-facing output.
    pub fn plain_values(&self) -> BTreeMap<CanonicalField, serde_json::Value> {
        self.fields
            .iter()
            .map(|(k, v)| (*k, v.value.to_json()))
            .collect()
    }

    /// Combine profiles in priority order: for each field the first profile
    /// that has it wins.
    pub fn merge<I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = ExtractedProfile>,
    {
        let mut fields = BTreeMap::new();
        let mut rejections = Vec::new();

        for profile in profiles {
            for (field, extracted) in profile.fields {
                fields.entry(field).or_insert(extracted);
            }
            rejections.extend(profile.rejections);
        }

        Self { fields, rejections }
    }
}
