//! Ordered pattern rules mapping document text onto canonical fields.
//!
//! Rule tables are data: the built-in table is a JSON document compiled into
//! the crate, and a replacement can be loaded from a file without touching
//! the matching logic.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::normalize::Normalizer;
use super::ProfileSource;
use crate::error::{ConfigError, Result};
use crate::models::field::CanonicalField;
use crate::models::profile::{ExtractedField, ExtractedProfile, NormalizationRejection};

const BUILTIN_RULES: &str = include_str!("default_rules.json");

lazy_static! {
    static ref BUILTIN: RuleTable =
        RuleTable::from_json(BUILTIN_RULES).expect("built-in rule table is valid");
}

fn default_group() -> usize {
    1
}

fn default_source_name() -> String {
    "rules".to_string()
}

/// Serialized form of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub regex: String,
    /// Capture group holding the value; 0 is the whole match.
    #[serde(default = "default_group")]
    pub group: usize,
}

/// Serialized form of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub field: String,
    pub normalizer: Normalizer,
    pub patterns: Vec<PatternSpec>,
}

/// Serialized form of a rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTableSpec {
    #[serde(default = "default_source_name")]
    pub name: String,
    pub rules: Vec<RuleSpec>,
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    regex: Regex,
    group: usize,
}

impl Pattern {
    pub fn new(rule: &str, spec: &PatternSpec) -> std::result::Result<Self, ConfigError> {
        let id = format!("{}/{}", rule, spec.name);
        let regex = Regex::new(&spec.regex).map_err(|e| ConfigError::InvalidPattern {
            rule: id.clone(),
            reason: e.to_string(),
        })?;

        if spec.group >= regex.captures_len() {
            return Err(ConfigError::MissingCaptureGroup {
                rule: id,
                group: spec.group,
            });
        }

        Ok(Self {
            name: spec.name.clone(),
            regex,
            group: spec.group,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Captured values in text order.
    fn captures<'t>(&'t self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.regex
            .captures_iter(text)
            .filter_map(move |caps| caps.get(self.group).map(|m| m.as_str()))
    }
}

/// One canonical field, its prioritized patterns and its normalizer.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    field: CanonicalField,
    normalizer: Normalizer,
    patterns: Vec<Pattern>,
}

/// What a rule found in a text.
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub hit: Option<ExtractedField>,
    pub rejections: Vec<NormalizationRejection>,
}

impl ExtractionRule {
    pub fn new(spec: &RuleSpec) -> std::result::Result<Self, ConfigError> {
        let field: CanonicalField = spec.field.parse()?;
        let patterns = spec
            .patterns
            .iter()
            .map(|p| Pattern::new(field.as_str(), p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            field,
            normalizer: spec.normalizer.clone(),
            patterns,
        })
    }

    pub fn field(&self) -> CanonicalField {
        self.field
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Try patterns in priority order; the first capture that normalizes wins.
    ///
    /// Captures that fail normalization count as no match and are recorded
    /// as rejections.
    pub fn apply(&self, text: &str, source: &str) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        for pattern in &self.patterns {
            let rule = format!("{}/{}", self.field, pattern.name);

            for raw in pattern.captures(text) {
                match self.normalizer.apply(raw) {
                    Ok(value) => {
                        trace!("{} matched {:?}", rule, raw);
                        outcome.hit = Some(ExtractedField {
                            value,
                            rule,
                            source: source.to_string(),
                            matched: raw.to_string(),
                        });
                        return outcome;
                    }
                    Err(reason) => {
                        debug!("{} rejected {:?}: {}", rule, raw, reason);
                        outcome.rejections.push(NormalizationRejection {
                            field: self.field,
                            rule: rule.clone(),
                            source: source.to_string(),
                            matched: raw.to_string(),
                            reason,
                        });
                    }
                }
            }
        }

        outcome
    }
}

/// A compiled, validated rule table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    name: String,
    rules: Vec<ExtractionRule>,
}

impl RuleTable {
    /// The built-in table.
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN
    }

    /// Compile a table, rejecting bad patterns and duplicate fields.
    pub fn from_spec(spec: &RuleTableSpec) -> std::result::Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(spec.rules.len());

        for rule_spec in &spec.rules {
            let rule = ExtractionRule::new(rule_spec)?;
            if !seen.insert(rule.field) {
                return Err(ConfigError::DuplicateRule(rule.field.to_string()));
            }
            rules.push(rule);
        }

        Ok(Self {
            name: spec.name.clone(),
            rules,
        })
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, ConfigError> {
        let spec: RuleTableSpec =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
                what: "rule table".to_string(),
                reason: e.to_string(),
            })?;
        Self::from_spec(&spec)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn rule(&self, field: CanonicalField) -> Option<&ExtractionRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ProfileSource for RuleTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, text: &str) -> ExtractedProfile {
        let text = text.replace("\r\n", "\n");
        let mut fields = BTreeMap::new();
        let mut rejections = Vec::new();

        for rule in &self.rules {
            let outcome = rule.apply(&text, &self.name);
            rejections.extend(outcome.rejections);
            if let Some(hit) = outcome.hit {
                fields.insert(rule.field, hit);
            }
        }

        ExtractedProfile::from_parts(fields, rejections)
    }
}
