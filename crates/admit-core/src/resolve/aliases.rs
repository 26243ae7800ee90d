//! Canonical field alias table.
//!
//! The table is data: the built-in copy is a JSON document compiled into the
//! crate, and a replacement can be loaded from disk. Resolution logic only
//! reads it.

use std::collections::HashSet;
use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::models::field::CanonicalField;

const BUILTIN_ALIASES: &str = include_str!("default_aliases.json");

lazy_static! {
    static ref BUILTIN: AliasTable =
        AliasTable::from_json(BUILTIN_ALIASES).expect("built-in alias table is valid");
}

/// Aliases for one canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub field: CanonicalField,
    /// Alternate names in priority order.
    pub aliases: Vec<String>,
    /// Tokens that disqualify a candidate (e.g. "confirm" for email).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    /// Default `type` attribute of the field's control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

impl AliasEntry {
    /// Whether any of the texts contains an exclusion token.
    pub fn excludes_any<'a, I>(&self, texts: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let texts: Vec<String> = texts.into_iter().map(compact).collect();
        self.excludes.iter().map(|e| compact(e)).any(|token| {
            !token.is_empty() && texts.iter().any(|t| t.contains(&token))
        })
    }
}

/// Validated alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// The built-in table.
    pub fn builtin() -> &'static AliasTable {
        &BUILTIN
    }

    pub fn new(entries: Vec<AliasEntry>) -> std::result::Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.field) {
                return Err(ConfigError::DuplicateAliases(entry.field.to_string()));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct Document {
            entries: Vec<AliasEntry>,
        }

        let doc: Document = serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
            what: "alias table".to_string(),
            reason: e.to_string(),
        })?;
        Self::new(doc.entries)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn get(&self, field: CanonicalField) -> Option<&AliasEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    /// Aliases of a field; empty when the table has no entry for it.
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.get(field).map(|e| e.aliases.as_slice()).unwrap_or(&[])
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercased alphanumerics only: `"phone_Number"` → `"phonenumber"`.
pub fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Lowercased words separated by single spaces: `"First Name *:"` → `"first name"`.
pub fn words(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `phrase` occurs in `text` as whole words (both already `words`-normalized).
pub fn contains_words(text: &str, phrase: &str) -> bool {
    !phrase.is_empty() && format!(" {} ", text).contains(&format!(" {} ", phrase))
}
