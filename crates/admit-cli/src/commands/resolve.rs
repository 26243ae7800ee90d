//! Resolve command - locate form controls for canonical fields.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use admit_core::models::config::AdmitConfig;
use admit_core::models::field::CanonicalField;
use admit_core::models::university::{FormKind, UniversityConfig};
use admit_core::resolve::{
    FieldSelectorSpec, HtmlForm, NotFound, ResolvedTarget, SelectorResolver,
};

use super::{load_config, load_university};

/// Which of a university's forms a page is.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FormKindArg {
    /// Account creation form
    Signup,
    /// Application form
    Application,
}

impl From<FormKindArg> for FormKind {
    fn from(kind: FormKindArg) -> Self {
        match kind {
            FormKindArg::Signup => FormKind::Signup,
            FormKindArg::Application => FormKind::Application,
        }
    }
}

/// Where selector declarations come from.
#[derive(Args)]
pub struct FormSpecArgs {
    /// University configuration (file path or name in the universities directory)
    #[arg(short, long)]
    pub university: Option<String>,

    /// Which of the university's forms the page is
    #[arg(short, long, value_enum, default_value = "application")]
    pub kind: FormKindArg,

    /// Explicit selector as FIELD=CSS (repeatable)
    #[arg(short = 's', long = "selector", value_parser = parse_selector)]
    pub selectors: Vec<(CanonicalField, String)>,
}

impl FormSpecArgs {
    /// The university (if any) and the validated selector spec.
    pub fn load(
        &self,
        config: &AdmitConfig,
    ) -> anyhow::Result<(Option<UniversityConfig>, FieldSelectorSpec)> {
        let university = self
            .university
            .as_deref()
            .map(|u| load_university(u, config))
            .transpose()?;

        let mut builder = match &university {
            Some(university) => university.spec_builder(self.kind.into())?,
            None => FieldSelectorSpec::builder(),
        };
        for (field, selector) in &self.selectors {
            builder = builder.selector(*field, selector.clone());
        }

        Ok((university, builder.build()?))
    }
}

fn parse_selector(s: &str) -> Result<(CanonicalField, String), String> {
    let (field, selector) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=CSS, got {:?}", s))?;
    let field = field.parse::<CanonicalField>().map_err(|e| e.to_string())?;
    Ok((field, selector.to_string()))
}

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Saved HTML of the form page
    #[arg(required = true)]
    form: PathBuf,

    /// Fields to resolve (default: every canonical field)
    #[arg(short, long = "field")]
    fields: Vec<CanonicalField>,

    #[command(flatten)]
    spec: FormSpecArgs,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Resolution {
    Resolved(ResolvedTarget),
    NotFound(NotFound),
}

pub async fn run(args: ResolveArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let (_, spec) = args.spec.load(&config)?;
    let resolver = SelectorResolver::new(config.alias_table()?);

    if !args.form.exists() {
        anyhow::bail!("Form file not found: {}", args.form.display());
    }
    let form = HtmlForm::parse(&fs::read_to_string(&args.form)?);

    let fields = if args.fields.is_empty() {
        CanonicalField::ALL.to_vec()
    } else {
        args.fields.clone()
    };

    let resolutions: Vec<Resolution> = fields
        .iter()
        .map(|field| match resolver.resolve(*field, &spec, &form) {
            Ok(target) => Resolution::Resolved(target),
            Err(not_found) => Resolution::NotFound(not_found),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolutions)?);
        return Ok(());
    }

    for resolution in &resolutions {
        match resolution {
            Resolution::Resolved(target) => println!(
                "{} {:<18} {:<12} {}",
                style("✓").green(),
                target.field.as_str(),
                target.strategy.to_string(),
                target.selector
            ),
            Resolution::NotFound(not_found) => println!(
                "{} {:<18} {}",
                style("✗").red(),
                not_found.field.as_str(),
                style(not_found).dim()
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            parse_selector("first_name=#fn"),
            Ok((CanonicalField::FirstName, "#fn".to_string()))
        );
        assert_eq!(
            parse_selector("email=[name='a=b']"),
            Ok((CanonicalField::Email, "[name='a=b']".to_string()))
        );
        assert!(parse_selector("shoe_size=#s").is_err());
        assert!(parse_selector("email").is_err());
    }
}
