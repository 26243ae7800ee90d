//! Data models shared across the pipeline.

pub mod config;
pub mod field;
pub mod profile;
pub mod university;

pub use config::AdmitConfig;
pub use field::{CanonicalField, FieldType};
pub use profile::{ExtractedField, ExtractedProfile, FieldValue, NormalizationRejection};
pub use university::{FieldMapping, FormKind, FormPage, UniversityConfig};
