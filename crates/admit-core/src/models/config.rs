//! Configuration structures for the admit pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::extract::rules::RuleTable;
use crate::resolve::aliases::AliasTable;

/// Main configuration for the admit pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmitConfig {
    /// Document field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Form field resolution configuration.
    pub resolver: ResolverConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Replacement rule table (JSON). The built-in table is used when unset.
    pub rules_file: Option<PathBuf>,

    /// Record normalization rejections in the extracted profile output.
    pub keep_rejections: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            keep_rejections: true,
        }
    }
}

/// Selector resolution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Replacement alias table (JSON). The built-in table is used when unset.
    pub aliases_file: Option<PathBuf>,

    /// Directory holding per-university configuration files.
    pub universities_dir: Option<PathBuf>,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum text length to consider the PDF readable.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self { min_text_length: 20 }
    }
}

impl AdmitConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The configured rule table, or the built-in one.
    pub fn rule_table(&self) -> Result<RuleTable> {
        match &self.extraction.rules_file {
            Some(path) => RuleTable::from_file(path),
            None => Ok(RuleTable::builtin().clone()),
        }
    }

    /// The configured alias table, or the built-in one.
    pub fn alias_table(&self) -> Result<AliasTable> {
        match &self.resolver.aliases_file {
            Some(path) => AliasTable::from_file(path),
            None => Ok(AliasTable::builtin().clone()),
        }
    }

    /// Path of a university configuration by name.
    pub fn university_path(&self, name: &str) -> PathBuf {
        let dir = self
            .resolver
            .universities_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("university_configs"));
        dir.join(format!("{}.json", name))
    }
}
