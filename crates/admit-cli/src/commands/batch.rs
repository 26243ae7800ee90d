//! Batch command - extract profiles from many documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use admit_core::extract::ProfileExtractor;
use admit_core::models::config::AdmitConfig;
use admit_core::models::field::CanonicalField;
use admit_core::models::profile::ExtractedProfile;

use super::extract::{format_profile, OutputFormat};
use super::{extension_of, load_config, read_document, DOCUMENT_EXTENSIONS};

/// Fields echoed in the summary CSV.
const SUMMARY_FIELDS: &[CanonicalField] = &[
    CanonicalField::FirstName,
    CanonicalField::LastName,
    CanonicalField::Email,
    CanonicalField::Gpa,
    CanonicalField::SatScore,
];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the rule and source behind each value
    #[arg(long)]
    provenance: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    profile: Option<ExtractedProfile>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = Arc::new(load_config(config_path)?);

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| DOCUMENT_EXTENSIONS.contains(&extension_of(p).as_str()))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let extractor = Arc::new(
        ProfileExtractor::with_rules(config.rule_table()?)
            .with_rejections(config.extraction.keep_rejections),
    );

    // Extraction is CPU-bound; run it on blocking workers, `jobs` at a time.
    let mut pending = stream::iter(files)
        .map(|path| {
            let extractor = Arc::clone(&extractor);
            let config = Arc::clone(&config);
            tokio::task::spawn_blocking(move || {
                let file_start = Instant::now();
                let result = process_single_file(&path, &extractor, &config);
                (path, result, file_start.elapsed().as_millis() as u64)
            })
        })
        .buffer_unordered(args.jobs.max(1));

    let mut results = Vec::new();
    while let Some(joined) = pending.next().await {
        let (path, result, processing_time_ms) = joined?;

        match result {
            Ok(profile) => results.push(ProcessResult {
                path,
                profile: Some(profile),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        profile: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    // Completion order depends on scheduling; report in path order.
    results.sort_by(|a, b| a.path.cmp(&b.path));

    let successful: Vec<_> = results.iter().filter(|r| r.profile.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Some(profile) = &result.profile {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("profile");
                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                fs::write(&output_path, format_profile(profile, args.format, args.provenance)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    extractor: &ProfileExtractor,
    config: &AdmitConfig,
) -> anyhow::Result<ExtractedProfile> {
    let text = read_document(path, config)?;
    Ok(extractor.extract(&text))
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status", "fields_found"];
    header.extend(SUMMARY_FIELDS.iter().map(|f| f.as_str()));
    header.extend(["processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let mut record: Vec<String> = vec![filename.to_string()];
        match &result.profile {
            Some(profile) => {
                record.push("success".to_string());
                record.push(profile.len().to_string());
                record.extend(SUMMARY_FIELDS.iter().map(|f| {
                    profile.value(*f).map(|v| v.to_string()).unwrap_or_default()
                }));
                record.push(result.processing_time_ms.to_string());
                record.push(String::new());
            }
            None => {
                record.push("error".to_string());
                record.push(String::new());
                record.extend(SUMMARY_FIELDS.iter().map(|_| String::new()));
                record.push(result.processing_time_ms.to_string());
                record.push(result.error.clone().unwrap_or_default());
            }
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
