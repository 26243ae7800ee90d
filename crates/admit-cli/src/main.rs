//! CLI application for student profile extraction and application form filling.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, extract, plan, resolve, university};

/// Admit - Extract student profiles and map them onto application forms
#[derive(Parser)]
#[command(name = "admit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a profile from a single document
    Extract(extract::ExtractArgs),

    /// Extract profiles from multiple documents
    Batch(batch::BatchArgs),

    /// Locate form controls for canonical fields
    Resolve(resolve::ResolveArgs),

    /// Plan which values go into which form controls
    Plan(plan::PlanArgs),

    /// Manage university configurations
    University(university::UniversityArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Resolve(args) => resolve::run(args, config_path).await,
        Commands::Plan(args) => plan::run(args, config_path).await,
        Commands::University(args) => university::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
