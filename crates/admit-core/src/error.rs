//! Error types for the admit-core library.
//!
//! Data-quality problems (missing or unparsable fields, unresolved selectors)
//! are not errors here; they surface as absence or as typed results. Only
//! configuration mistakes and I/O failures use these types.

use thiserror::Error;

/// Main error type for the admit library.
#[derive(Error, Debug)]
pub enum AdmitError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed rule tables, alias tables or selector specs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field name is not one of the canonical fields.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Two different explicit selectors were declared for the same field.
    #[error("conflicting selectors for {field}: {first:?} vs {second:?}")]
    ConflictingSelectors {
        field: String,
        first: String,
        second: String,
    },

    /// A selector is empty or not valid CSS.
    #[error("invalid selector for {field}: {selector:?}")]
    InvalidSelector { field: String, selector: String },

    /// A pattern does not compile.
    #[error("invalid pattern {rule}: {reason}")]
    InvalidPattern { rule: String, reason: String },

    /// A pattern refers to a capture group it does not have.
    #[error("pattern {rule} has no capture group {group}")]
    MissingCaptureGroup { rule: String, group: usize },

    /// More than one extraction rule for a field.
    #[error("duplicate extraction rule for {0}")]
    DuplicateRule(String),

    /// More than one alias entry for a field.
    #[error("duplicate alias entry for {0}")]
    DuplicateAliases(String),

    /// A field group is malformed.
    #[error("invalid field group {group}: {reason}")]
    InvalidFieldGroup { group: String, reason: String },

    /// The document could not be parsed as the expected JSON shape.
    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Result type for the admit library.
pub type Result<T> = std::result::Result<T, AdmitError>;
