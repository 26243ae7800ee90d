//! University command - create and check per-university configurations.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use admit_core::models::university::{FormKind, UniversityConfig};

use super::{load_config, load_university};

/// Arguments for the university command.
#[derive(Args)]
pub struct UniversityArgs {
    #[command(subcommand)]
    command: UniversityCommand,
}

#[derive(Subcommand)]
enum UniversityCommand {
    /// Write a starting configuration for a new university
    Template(TemplateArgs),

    /// Validate a university configuration
    Check {
        /// File path or name in the universities directory
        university: String,
    },

    /// List configurations in the universities directory
    List,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Example {
    /// Every canonical field with placeholder selectors
    Blank,
    /// Common Application style portal
    CommonApp,
    /// Slate-based portal
    Slate,
}

#[derive(Args)]
struct TemplateArgs {
    /// Configuration name (file stem in the universities directory)
    #[arg(default_value = "template")]
    name: String,

    /// Output path (overrides the universities directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Which starting point to write
    #[arg(short, long, value_enum, default_value = "blank")]
    example: Example,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: UniversityArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        UniversityCommand::Template(template_args) => write_template(template_args, config_path),
        UniversityCommand::Check { university } => check(&university, config_path),
        UniversityCommand::List => list(config_path),
    }
}

fn write_template(args: TemplateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let output_path = args
        .output
        .unwrap_or_else(|| config.university_path(&args.name));

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "University configuration already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    let university = match args.example {
        Example::Blank => UniversityConfig::template(),
        Example::CommonApp => UniversityConfig::common_app_example(),
        Example::Slate => UniversityConfig::slate_example(),
    };
    university.save(&output_path)?;

    println!(
        "{} Configuration saved to {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn check(name_or_path: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let university = load_university(name_or_path, &config)?;

    println!("{} {}", style("✓").green(), style(&university.name).bold());
    for kind in [FormKind::Signup, FormKind::Application] {
        let spec = university.selector_spec(kind)?;
        println!(
            "   {:<12} {} mapped fields, {} groups",
            kind.to_string(),
            spec.mapped_fields().len(),
            spec.groups().len()
        );
    }
    if university.multi_page {
        println!("   {} pages", university.pages.len());
    }

    Ok(())
}

fn list(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let dir = config
        .university_path("_")
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();

    if !dir.exists() {
        println!(
            "{} No universities directory at {}",
            style("ℹ").blue(),
            dir.display()
        );
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    entries.sort();

    for path in entries {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match UniversityConfig::from_file(&path) {
            Ok(university) => println!("{} {:<28} {}", style("✓").green(), stem, university.name),
            Err(e) => println!("{} {:<28} {}", style("✗").red(), stem, style(e).dim()),
        }
    }

    Ok(())
}
