//! Fill plans: which value goes into which control.
//!
//! A plan is the hand-off to the browser driver. It carries no policy about
//! what to do with fields that could not be filled; callers inspect
//! `missing` and `unresolved` and decide whether to submit.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::models::field::{CanonicalField, FieldType};
use crate::models::profile::ExtractedProfile;
use crate::resolve::{FieldSelectorSpec, FormView, NotFound, SelectorResolver, Strategy};

/// Shown in place of secret values.
pub const REDACTED: &str = "********";

/// One control to fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillTarget {
    pub field: CanonicalField,
    pub selector: String,
    pub strategy: Strategy,
    pub value: String,
    pub field_type: FieldType,
}

impl FillTarget {
    /// Password values must never reach logs or printed output.
    pub fn is_secret(&self) -> bool {
        self.field == CanonicalField::Password || self.field_type == FieldType::Password
    }
}

/// Resolved targets plus everything that could not be planned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillPlan {
    pub targets: Vec<FillTarget>,
    /// Requested fields with no value to fill in.
    pub missing: Vec<CanonicalField>,
    /// Fields with a value but no control.
    pub unresolved: Vec<NotFound>,
}

impl FillPlan {
    /// Every requested field has a target.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unresolved.is_empty()
    }

    pub fn target(&self, field: CanonicalField) -> Option<&FillTarget> {
        self.targets.iter().find(|t| t.field == field)
    }

    /// Copy of the plan with secret values replaced, for display.
    pub fn redacted(&self) -> FillPlan {
        let mut plan = self.clone();
        for target in plan.targets.iter_mut().filter(|t| t.is_secret()) {
            target.value = REDACTED.to_string();
        }
        plan
    }
}

/// Values as typed into a form, keyed by field.
pub type FillValues = BTreeMap<CanonicalField, String>;

/// Render a profile's values the way a form expects them.
pub fn profile_values(profile: &ExtractedProfile) -> FillValues {
    profile
        .iter()
        .map(|(field, extracted)| (field, extracted.value.to_string()))
        .collect()
}

/// Plan how to fill `fields` on a form.
///
/// Fields are processed in the order given. A field without a value is
/// listed as missing and never resolved.
pub fn plan_fill<F>(
    resolver: &SelectorResolver,
    values: &FillValues,
    spec: &FieldSelectorSpec,
    form: &F,
    fields: &[CanonicalField],
) -> FillPlan
where
    F: FormView + ?Sized,
{
    let mut plan = FillPlan::default();

    for &field in fields {
        let Some(value) = values.get(&field).filter(|v| !v.is_empty()) else {
            plan.missing.push(field);
            continue;
        };

        match resolver.resolve(field, spec, form) {
            Ok(target) => {
                let field_type = spec
                    .field_type(field)
                    .unwrap_or_else(|| target.element.field_type());
                plan.targets.push(FillTarget {
                    field,
                    selector: target.selector,
                    strategy: target.strategy,
                    value: value.clone(),
                    field_type,
                });
            }
            Err(not_found) => plan.unresolved.push(not_found),
        }
    }

    info!(
        "Planned {} targets ({} missing, {} unresolved)",
        plan.targets.len(),
        plan.missing.len(),
        plan.unresolved.len()
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract;
    use crate::resolve::HtmlForm;
    use pretty_assertions::assert_eq;

    const SIGNUP_FORM: &str = r#"
        <form>
          <input id="firstName" type="text">
          <input id="lastName" type="text">
          <input name="userEmail" type="email">
          <label for="pw">Password</label><input id="pw" type="password">
          <input name="middle_name">
          <input type="submit" value="Sign up">
        </form>"#;

    #[test]
    fn test_plan_signup() {
        let profile =
            extract::extract("Student: John Smith\nEmail: john.smith@email.com\nGPA: 3.85");
        let mut values = profile_values(&profile);
        values.insert(CanonicalField::Password, "s3cret!".to_string());

        let spec = FieldSelectorSpec::builder()
            .selector(CanonicalField::FirstName, "#firstName")
            .selector(CanonicalField::LastName, "#lastName")
            .build()
            .unwrap();
        let form = HtmlForm::parse(SIGNUP_FORM);
        let fields = [
            CanonicalField::FirstName,
            CanonicalField::MiddleName,
            CanonicalField::LastName,
            CanonicalField::Email,
            CanonicalField::Password,
            CanonicalField::Phone,
        ];

        let plan = plan_fill(&SelectorResolver::default(), &values, &spec, &form, &fields);

        let summary: Vec<(CanonicalField, &str, Strategy, &str, FieldType)> = plan
            .targets
            .iter()
            .map(|t| (t.field, t.selector.as_str(), t.strategy, t.value.as_str(), t.field_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CanonicalField::FirstName, "#firstName", Strategy::Explicit, "John", FieldType::Text),
                (CanonicalField::LastName, "#lastName", Strategy::Explicit, "Smith", FieldType::Text),
                (
                    CanonicalField::Email,
                    "input[name=\"userEmail\"]",
                    Strategy::Attribute,
                    "john.smith@email.com",
                    FieldType::Email
                ),
                (CanonicalField::Password, "#pw", Strategy::Attribute, "s3cret!", FieldType::Password),
            ]
        );
        assert_eq!(plan.missing, vec![CanonicalField::MiddleName, CanonicalField::Phone]);
        assert!(plan.unresolved.is_empty());
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_unresolved_and_declared_type() {
        let mut values = FillValues::new();
        values.insert(CanonicalField::Gender, "Female".to_string());
        values.insert(CanonicalField::Gpa, "3.85".to_string());

        let spec = FieldSelectorSpec::builder()
            .selector(CanonicalField::Gender, "#gender")
            .field_type(CanonicalField::Gender, FieldType::Select)
            .build()
            .unwrap();
        let form = HtmlForm::parse(r#"<input id="gender">"#);

        let plan = plan_fill(
            &SelectorResolver::default(),
            &values,
            &spec,
            &form,
            &[CanonicalField::Gender, CanonicalField::Gpa],
        );

        assert_eq!(plan.target(CanonicalField::Gender).unwrap().field_type, FieldType::Select);
        assert_eq!(plan.unresolved.len(), 1);
        assert_eq!(plan.unresolved[0].field, CanonicalField::Gpa);
        assert!(plan.missing.is_empty());
    }

    #[test]
    fn test_redacted_masks_password_controls() {
        let mut values = FillValues::new();
        values.insert(CanonicalField::Email, "jane@school.edu".to_string());
        values.insert(CanonicalField::Password, "hunter2".to_string());

        let form = HtmlForm::parse(SIGNUP_FORM);
        let plan = plan_fill(
            &SelectorResolver::default(),
            &values,
            &FieldSelectorSpec::default(),
            &form,
            &[CanonicalField::Email, CanonicalField::Password],
        );
        let shown = plan.redacted();

        assert_eq!(plan.target(CanonicalField::Password).unwrap().value, "hunter2");
        assert_eq!(shown.target(CanonicalField::Password).unwrap().value, REDACTED);
        assert_eq!(shown.target(CanonicalField::Email).unwrap().value, "jane@school.edu");

        let json = serde_json::to_string(&shown).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
