//! Core library for turning student documents into application form fills.
//!
//! This crate provides:
//! - Student profile extraction from document text using ordered pattern rules
//! - Form control resolution with layered selector strategies
//! - Per-university portal configuration and fill planning
//! - PDF text extraction (feature `pdf`)

pub mod error;
pub mod extract;
pub mod fill;
pub mod models;
pub mod resolve;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use error::{AdmitError, ConfigError, PdfError, Result};
pub use extract::{extract, ProfileExtractor, ProfileSource, RuleTable};
pub use fill::{plan_fill, profile_values, FillPlan, FillTarget, FillValues};
pub use models::{
    AdmitConfig, CanonicalField, ExtractedField, ExtractedProfile, FieldType, FieldValue,
    FormKind, NormalizationRejection, UniversityConfig,
};
pub use resolve::{
    AliasTable, FieldSelectorSpec, FormElement, FormView, HtmlForm, NotFound, ResolvedTarget,
    SelectorResolver, Strategy,
};

#[cfg(feature = "pdf")]
pub use pdf::{PdfContent, PdfExtractor, PdfProcessor, PdfType};
