//! Extract command - build a student profile from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use admit_core::extract::ProfileExtractor;
use admit_core::models::profile::ExtractedProfile;

use super::{load_config, read_document};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (PDF or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the rule and source behind each value
    #[arg(long)]
    provenance: bool,

    /// Print captures rejected during normalization
    #[arg(long)]
    show_rejections: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    pb.set_message("Reading document...");
    pb.set_position(20);
    let text = read_document(&args.input, &config)?;

    pb.set_message("Extracting profile...");
    pb.set_position(60);
    let extractor = ProfileExtractor::with_rules(config.rule_table()?)
        .with_rejections(config.extraction.keep_rejections);
    let profile = extractor.extract(&text);

    pb.finish_and_clear();

    let output = format_profile(&profile, args.format, args.provenance)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_rejections && !profile.rejections().is_empty() {
        eprintln!("{}", style("Rejected captures:").yellow());
        for rejection in profile.rejections() {
            eprintln!(
                "  - {} {:?}: {}",
                rejection.rule, rejection.matched, rejection.reason
            );
        }
    }

    debug!(
        "Extracted {} fields in {:?}",
        profile.len(),
        start.elapsed()
    );

    Ok(())
}

pub fn format_profile(
    profile: &ExtractedProfile,
    format: OutputFormat,
    provenance: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if provenance => Ok(serde_json::to_string_pretty(profile)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&profile.plain_values())?),
        OutputFormat::Csv => format_csv(profile),
        OutputFormat::Text => Ok(format_text(profile, provenance)),
    }
}

fn format_csv(profile: &ExtractedProfile) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value", "rule", "source", "matched"])?;

    for (field, extracted) in profile.iter() {
        wtr.write_record([
            field.as_str(),
            &extracted.value.to_string(),
            &extracted.rule,
            &extracted.source,
            &extracted.matched,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(profile: &ExtractedProfile, provenance: bool) -> String {
    if profile.is_empty() {
        return "No fields found.".to_string();
    }

    let width = profile
        .iter()
        .map(|(field, _)| field.as_str().len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    for (field, extracted) in profile.iter() {
        output.push_str(&format!("{:width$}  {}", field.as_str(), extracted.value, width = width));
        if provenance {
            output.push_str(&format!("  ({})", extracted.rule));
        }
        output.push('\n');
    }
    output.push_str(&format!("\n{} fields", profile.len()));

    output
}
