//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod plan;
pub mod resolve;
pub mod university;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use admit_core::models::config::AdmitConfig;
use admit_core::models::university::UniversityConfig;
use admit_core::pdf::{PdfExtractor, PdfProcessor, PdfType};

/// Document formats the extractor reads.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt", "text", "md"];

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("admit")
        .join("config.json")
}

/// Configuration from `--config`, else the user file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<AdmitConfig> {
    if let Some(path) = config_path {
        return Ok(AdmitConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using configuration at {}", path.display());
        Ok(AdmitConfig::from_file(&path)?)
    } else {
        Ok(AdmitConfig::default())
    }
}

/// A university configuration given as a file path or a name in the
/// configured universities directory.
pub fn load_university(name_or_path: &str, config: &AdmitConfig) -> anyhow::Result<UniversityConfig> {
    let direct = PathBuf::from(name_or_path);
    let path = if direct.exists() {
        direct
    } else {
        config.university_path(name_or_path)
    };

    if !path.exists() {
        anyhow::bail!("University configuration not found: {}", path.display());
    }
    Ok(UniversityConfig::from_file(&path)?)
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Text of a document: the text layer of a PDF, or a plain text file.
pub fn read_document(path: &Path, config: &AdmitConfig) -> anyhow::Result<String> {
    let extension = extension_of(path);

    match extension.as_str() {
        "pdf" => {
            let data = fs::read(path)?;
            let mut extractor = PdfExtractor::new().with_min_text_length(config.pdf.min_text_length);
            extractor.load(&data)?;

            let content = extractor.extract_all()?;
            debug!("PDF has {} pages", content.pages.len());
            for page in content.pages.iter().filter(|p| p.text.trim().is_empty()) {
                debug!("Page {} has no text layer", page.number);
            }

            if content.pdf_type == PdfType::Empty {
                anyhow::bail!(
                    "PDF has no usable text layer: {} (scanned documents need OCR first)",
                    path.display()
                );
            }
            Ok(content.text)
        }
        "txt" | "text" | "md" => Ok(fs::read_to_string(path)?),
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}
