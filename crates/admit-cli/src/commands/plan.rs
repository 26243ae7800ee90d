//! Plan command - match a profile's values to a form's controls.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use admit_core::extract::ProfileExtractor;
use admit_core::fill::{plan_fill, profile_values, FillPlan, FillValues};
use admit_core::models::field::CanonicalField;
use admit_core::resolve::{HtmlForm, SelectorResolver};

use super::resolve::FormSpecArgs;
use super::{load_config, read_document};

/// Arguments for the plan command.
#[derive(Args)]
pub struct PlanArgs {
    /// Saved HTML of the form page
    #[arg(required = true)]
    form: PathBuf,

    /// Student document to extract values from (PDF or text)
    #[arg(short, long, conflicts_with = "values", required_unless_present = "values")]
    document: Option<PathBuf>,

    /// JSON object of field values, as written by `admit extract`
    #[arg(long)]
    values: Option<PathBuf>,

    #[command(flatten)]
    spec: FormSpecArgs,

    /// Only plan the fields of this page of a multi-page application
    #[arg(long, requires = "university")]
    page: Option<u32>,

    /// Environment variable holding the account password
    #[arg(long)]
    password_env: Option<String>,

    /// Fail when a requested field is missing or unresolved
    #[arg(long)]
    require_complete: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: PlanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let (university, spec) = args.spec.load(&config)?;

    let mut values = match (&args.document, &args.values) {
        (Some(document), _) => {
            let text = read_document(document, &config)?;
            let extractor = ProfileExtractor::with_rules(config.rule_table()?);
            profile_values(&extractor.extract(&text))
        }
        (None, Some(path)) => read_values(path)?,
        (None, None) => anyhow::bail!("Either --document or --values is required"),
    };

    if let Some(var) = &args.password_env {
        let password = std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable {} is not set", var))?;
        values.insert(CanonicalField::Password, password);
    }

    let fields = match (args.page, &university) {
        (Some(page), Some(university)) => university.page_fields(page)?,
        _ if !spec.mapped_fields().is_empty() => spec.mapped_fields(),
        _ => values.keys().copied().collect(),
    };

    if !args.form.exists() {
        anyhow::bail!("Form file not found: {}", args.form.display());
    }
    let form = HtmlForm::parse(&fs::read_to_string(&args.form)?);
    let resolver = SelectorResolver::new(config.alias_table()?);

    let plan = plan_fill(&resolver, &values, &spec, &form, &fields);

    let shown = plan.redacted();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        print_plan(&shown);
    }

    if args.require_complete && !plan.is_complete() {
        anyhow::bail!(
            "Plan is incomplete: {} missing, {} unresolved",
            plan.missing.len(),
            plan.unresolved.len()
        );
    }

    Ok(())
}

/// Field values from JSON, as written by `admit extract`; numbers keep their textual form.
fn read_values(path: &Path) -> anyhow::Result<FillValues> {
    let raw: BTreeMap<CanonicalField, serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(path)?)?;

    Ok(raw
        .into_iter()
        .filter_map(|(field, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((field, s)),
            other => Some((field, other.to_string())),
        })
        .collect())
}

fn print_plan(plan: &FillPlan) {
    for target in &plan.targets {
        println!(
            "{} {:<18} {:<40} {} ({})",
            style("✓").green(),
            target.field.as_str(),
            target.selector,
            target.value,
            target.strategy
        );
    }
    for not_found in &plan.unresolved {
        println!("{} {}", style("✗").red(), not_found);
    }
    if !plan.missing.is_empty() {
        let missing: Vec<&str> = plan.missing.iter().map(|f| f.as_str()).collect();
        println!("{} no value for {}", style("!").yellow(), missing.join(", "));
    }
}
