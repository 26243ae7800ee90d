//! Canonical field → form control resolution.
//!
//! Strategies run in a fixed order and the first success wins:
//! explicit selector, attribute match, label match, placeholder match,
//! positional fallback. The resolver is stateless and never touches markup.

pub mod aliases;
pub mod form;
pub mod spec;

pub use aliases::{AliasEntry, AliasTable};
pub use form::{FormElement, FormLabel, FormView, HtmlForm};
pub use spec::{FieldGroup, FieldSelector, FieldSelectorSpec, FieldSelectorSpecBuilder};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::models::field::CanonicalField;
use aliases::{compact, contains_words, words};

/// A resolution strategy, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Explicit,
    Attribute,
    Label,
    Placeholder,
    Positional,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::Attribute => "attribute",
            Self::Label => "label",
            Self::Placeholder => "placeholder",
            Self::Positional => "positional",
        })
    }
}

/// A control located for a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub field: CanonicalField,
    pub strategy: Strategy,
    /// Selector to hand to the browser driver.
    pub selector: String,
    /// What matched: the declared selector, alias, label or group name.
    pub matched: String,
    pub element: FormElement,
}

/// No strategy located a control for the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("no control found for {field} (tried {})", join_strategies(.attempted))]
pub struct NotFound {
    pub field: CanonicalField,
    pub attempted: Vec<Strategy>,
}

fn join_strategies(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(Strategy::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A candidate text and whether the field's exclusion tokens apply to it.
struct Candidate<'a> {
    text: &'a str,
    from_table: bool,
}

/// Layered field → control resolver.
#[derive(Debug, Clone)]
pub struct SelectorResolver {
    aliases: AliasTable,
}

impl SelectorResolver {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Locate the control for `field`.
    pub fn resolve<F>(
        &self,
        field: CanonicalField,
        spec: &FieldSelectorSpec,
        form: &F,
    ) -> Result<ResolvedTarget, NotFound>
    where
        F: FormView + ?Sized,
    {
        let mut attempted = Vec::new();
        let declared = spec.get(field);
        let entry = self.aliases.get(field);

        if let Some(selector) = spec.selector(field) {
            attempted.push(Strategy::Explicit);
            if let Some(element) = form.select(selector) {
                return Ok(self.found(field, Strategy::Explicit, selector, element));
            }
            if declared.is_some_and(|d| d.exact) {
                debug!("Exact selector {:?} for {} not present", selector, field);
                return Err(NotFound { field, attempted });
            }
            trace!("Selector {:?} for {} not present, falling through", selector, field);
        }

        attempted.push(Strategy::Attribute);
        if let Some(target) = self.by_attribute(field, spec, form) {
            return Ok(target);
        }

        let table_aliases = entry.map(|e| e.aliases.as_slice()).unwrap_or(&[]);

        attempted.push(Strategy::Label);
        let label_texts = declared.map(|d| d.labels.as_slice()).unwrap_or(&[]);
        if let Some(target) = self.by_label(field, candidates(label_texts, table_aliases), form) {
            return Ok(target);
        }

        attempted.push(Strategy::Placeholder);
        let placeholder_texts = declared.map(|d| d.placeholders.as_slice()).unwrap_or(&[]);
        if let Some(target) =
            self.by_placeholder(field, candidates(placeholder_texts, table_aliases), form)
        {
            return Ok(target);
        }

        attempted.push(Strategy::Positional);
        if let Some(target) = self.by_position(field, spec, form) {
            return Ok(target);
        }

        debug!("No control found for {}", field);
        Err(NotFound { field, attempted })
    }

    fn found(
        &self,
        field: CanonicalField,
        strategy: Strategy,
        matched: &str,
        element: FormElement,
    ) -> ResolvedTarget {
        debug!("Resolved {} via {} ({:?}) to {}", field, strategy, matched, element.selector);
        ResolvedTarget {
            field,
            strategy,
            selector: element.selector.clone(),
            matched: matched.to_string(),
            element,
        }
    }

    fn excluded(&self, field: CanonicalField, texts: &[Option<&str>]) -> bool {
        self.aliases
            .get(field)
            .is_some_and(|e| e.excludes_any(texts.iter().flatten().copied()))
    }

    fn by_attribute<F>(
        &self,
        field: CanonicalField,
        spec: &FieldSelectorSpec,
        form: &F,
    ) -> Option<ResolvedTarget>
    where
        F: FormView + ?Sized,
    {
        let controls: Vec<&FormElement> = form
            .controls()
            .iter()
            .filter(|c| !self.excluded(field, &[c.name.as_deref(), c.id.as_deref()]))
            .collect();

        for alias in self.aliases.aliases(field) {
            let needle = compact(alias);
            if needle.is_empty() {
                continue;
            }
            let hit = controls.iter().find(|c| {
                [c.name.as_deref(), c.id.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|attr| compact(attr).contains(&needle))
            });
            if let Some(control) = hit {
                return Some(self.found(field, Strategy::Attribute, alias, (*control).clone()));
            }
        }

        let input_type = spec
            .get(field)
            .and_then(|d| d.input_type.as_deref())
            .or_else(|| self.aliases.get(field).and_then(|e| e.input_type.as_deref()))?;

        let mut typed = controls
            .iter()
            .filter(|c| c.input_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(input_type)));
        match (typed.next(), typed.next()) {
            (Some(only), None) => Some(self.found(
                field,
                Strategy::Attribute,
                &format!("type={}", input_type),
                (*only).clone(),
            )),
            _ => None,
        }
    }

    fn by_label<F>(
        &self,
        field: CanonicalField,
        candidates: Vec<Candidate<'_>>,
        form: &F,
    ) -> Option<ResolvedTarget>
    where
        F: FormView + ?Sized,
    {
        let labels: Vec<(String, &FormElement, &str)> = form
            .labels()
            .iter()
            .filter_map(|l| l.control.as_ref().map(|c| (words(&l.text), c, l.text.as_str())))
            .collect();

        // Equality pass, then whole-word containment.
        for whole in [true, false] {
            for candidate in &candidates {
                let phrase = words(candidate.text);
                let hit = labels.iter().find(|(text, _, raw)| {
                    let matches = if whole {
                        *text == phrase
                    } else {
                        contains_words(text, &phrase)
                    };
                    matches && !(candidate.from_table && self.excluded(field, &[Some(*raw)]))
                });
                if let Some((_, control, _)) = hit {
                    return Some(self.found(field, Strategy::Label, candidate.text, (*control).clone()));
                }
            }
        }
        None
    }

    fn by_placeholder<F>(
        &self,
        field: CanonicalField,
        candidates: Vec<Candidate<'_>>,
        form: &F,
    ) -> Option<ResolvedTarget>
    where
        F: FormView + ?Sized,
    {
        for candidate in &candidates {
            let phrase = words(candidate.text);
            let hit = form.controls().iter().find(|c| {
                c.placeholder.as_deref().is_some_and(|p| {
                    contains_words(&words(p), &phrase)
                        && !(candidate.from_table && self.excluded(field, &[Some(p)]))
                })
            });
            if let Some(control) = hit {
                return Some(self.found(field, Strategy::Placeholder, candidate.text, control.clone()));
            }
        }
        None
    }

    fn by_position<F>(
        &self,
        field: CanonicalField,
        spec: &FieldSelectorSpec,
        form: &F,
    ) -> Option<ResolvedTarget>
    where
        F: FormView + ?Sized,
    {
        let (group, position) = spec.group_of(field)?;
        let controls = form.group_controls(group.container.as_deref(), group.label.as_deref());
        let control = controls.into_iter().nth(position)?;
        Some(self.found(field, Strategy::Positional, &group.name, control))
    }
}

impl Default for SelectorResolver {
    fn default() -> Self {
        Self::new(AliasTable::builtin().clone())
    }
}

/// Declared texts first, then the alias table.
fn candidates<'a>(declared: &'a [String], table: &'a [String]) -> Vec<Candidate<'a>> {
    declared
        .iter()
        .map(|text| Candidate {
            text: text.as_str(),
            from_table: false,
        })
        .chain(table.iter().map(|text| Candidate {
            text: text.as_str(),
            from_table: true,
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(
        field: CanonicalField,
        spec: &FieldSelectorSpec,
        html: &str,
    ) -> Result<ResolvedTarget, NotFound> {
        SelectorResolver::default().resolve(field, spec, &HtmlForm::parse(html))
    }

    fn no_spec() -> FieldSelectorSpec {
        FieldSelectorSpec::default()
    }

    #[test]
    fn test_explicit_selector() {
        let spec = FieldSelectorSpec::from_selectors([(CanonicalField::FirstName, "#firstName")])
            .unwrap();
        let target = resolve(CanonicalField::FirstName, &spec, r#"<input id="firstName">"#).unwrap();
        assert_eq!(target.strategy, Strategy::Explicit);
        assert_eq!(target.selector, "#firstName");
        assert_eq!(target.matched, "#firstName");
    }

    #[test]
    fn test_attribute_match() {
        let target = resolve(CanonicalField::Phone, &no_spec(), r#"<input name="phoneNumber">"#)
            .unwrap();
        assert_eq!(target.strategy, Strategy::Attribute);
        assert_eq!(target.selector, "input[name=\"phoneNumber\"]");
    }

    #[test]
    fn test_nothing_matches() {
        let form = r#"<form>
            <label for="fn">First Name</label><input id="fn">
            <input name="email" placeholder="Email">
        </form>"#;
        let err = resolve(CanonicalField::MiddleName, &no_spec(), form).unwrap_err();
        assert_eq!(
            err,
            NotFound {
                field: CanonicalField::MiddleName,
                attempted: vec![
                    Strategy::Attribute,
                    Strategy::Label,
                    Strategy::Placeholder,
                    Strategy::Positional,
                ],
            }
        );
        assert_eq!(
            err.to_string(),
            "no control found for middle_name (tried attribute, label, placeholder, positional)"
        );
    }

    #[test]
    fn test_explicit_wins_over_alias_match() {
        let form = r#"<input name="email"><input id="contact" type="text">"#;
        let spec = FieldSelectorSpec::from_selectors([(CanonicalField::Email, "#contact")]).unwrap();
        let target = resolve(CanonicalField::Email, &spec, form).unwrap();
        assert_eq!(target.strategy, Strategy::Explicit);
        assert_eq!(target.selector, "#contact");
    }

    #[test]
    fn test_missing_selector_falls_through() {
        let spec = FieldSelectorSpec::from_selectors([(CanonicalField::Email, "#gone")]).unwrap();
        let target = resolve(CanonicalField::Email, &spec, r#"<input name="email">"#).unwrap();
        assert_eq!(target.strategy, Strategy::Attribute);
    }

    #[test]
    fn test_exact_selector_stops_resolution() {
        let spec = FieldSelectorSpec::builder()
            .exact_selector(CanonicalField::Email, "#gone")
            .build()
            .unwrap();
        let err = resolve(CanonicalField::Email, &spec, r#"<input name="email">"#).unwrap_err();
        assert_eq!(err.attempted, vec![Strategy::Explicit]);
    }

    #[test]
    fn test_attribute_skips_excluded_controls() {
        let form = r#"<input name="confirm_email"><input name="user_email">"#;
        let target = resolve(CanonicalField::Email, &no_spec(), form).unwrap();
        assert_eq!(target.selector, "input[name=\"user_email\"]");
    }

    #[test]
    fn test_attribute_type_fallback_needs_unique_control() {
        let target = resolve(CanonicalField::Email, &no_spec(), r#"<input name="q1" type="email">"#)
            .unwrap();
        assert_eq!(target.strategy, Strategy::Attribute);
        assert_eq!(target.matched, "type=email");

        let two = r#"<input name="q1" type="email"><input name="q2" type="email">"#;
        assert!(resolve(CanonicalField::Email, &no_spec(), two).is_err());
    }

    #[test]
    fn test_label_match_prefers_equality() {
        let form = r#"<form>
            <label for="a">Preferred Last Name</label><input id="a">
            <label for="b">Last Name</label><input id="b">
        </form>"#;
        let target = resolve(CanonicalField::LastName, &no_spec(), form).unwrap();
        assert_eq!(target.strategy, Strategy::Label);
        assert_eq!(target.selector, "#b");
    }

    #[test]
    fn test_label_contains_whole_words() {
        let form = r#"<label>Legal First Name: <input id="q7"></label>"#;
        let target = resolve(CanonicalField::FirstName, &no_spec(), form).unwrap();
        assert_eq!(target.strategy, Strategy::Label);
        assert_eq!(target.selector, "#q7");
    }

    #[test]
    fn test_declared_label_tried_first() {
        let form = r#"<label for="x">Given name</label><input id="x">"#;
        let spec = FieldSelectorSpec::builder()
            .label(CanonicalField::FirstName, "Given name")
            .build()
            .unwrap();
        let target = resolve(CanonicalField::FirstName, &spec, form).unwrap();
        assert_eq!(target.strategy, Strategy::Label);
        assert_eq!(target.matched, "Given name");
    }

    #[test]
    fn test_placeholder_match() {
        let form = r#"<input id="q1" placeholder="Enter your city"><input id="q2" placeholder="Enter your zip">"#;
        let target = resolve(CanonicalField::City, &no_spec(), form).unwrap();
        assert_eq!(target.strategy, Strategy::Placeholder);
        assert_eq!(target.selector, "#q1");
    }

    #[test]
    fn test_positional_fallback() {
        let form = r#"<form>
            <fieldset id="who"><legend>Applicant</legend>
              <input id="q1"><input id="q2"><input id="q3">
            </fieldset>
        </form>"#;
        let spec = FieldSelectorSpec::builder()
            .group(FieldGroup {
                name: "applicant".to_string(),
                members: vec![
                    CanonicalField::FirstName,
                    CanonicalField::MiddleName,
                    CanonicalField::LastName,
                ],
                container: None,
                label: Some("Applicant".to_string()),
            })
            .build()
            .unwrap();
        let target = resolve(CanonicalField::MiddleName, &spec, form).unwrap();
        assert_eq!(target.strategy, Strategy::Positional);
        assert_eq!(target.selector, "#q2");
        assert_eq!(target.matched, "applicant");
    }

    #[test]
    fn test_resolution_is_total_over_fields() {
        let form = HtmlForm::parse(r#"<form><input name="anything"></form>"#);
        let resolver = SelectorResolver::default();
        for field in CanonicalField::ALL {
            match resolver.resolve(field, &no_spec(), &form) {
                Ok(target) => assert_eq!(target.field, field),
                Err(err) => assert_eq!(err.field, field),
            }
        }
    }
}
