//! Student profile extraction from unstructured document text.

pub mod normalize;
pub mod rules;

pub use normalize::Normalizer;
pub use rules::{ExtractionRule, Pattern, RuleTable, RuleTableSpec};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::models::profile::ExtractedProfile;

/// A provider of partial profiles.
///
/// Implementations must be pure functions of the input text: extraction
/// never fails, and a field a source cannot find is simply absent.
pub trait ProfileSource: Send + Sync {
    /// Name recorded as provenance on every field this source produces.
    fn name(&self) -> &str;

    /// Extract whatever fields this source can find.
    fn extract(&self, text: &str) -> ExtractedProfile;
}

/// Priority-ordered composition of profile sources.
///
/// For each field the first source that produces it wins, so the
/// deterministic rule table can be followed by fuzzier sources (for example
/// an AI-backed extractor supplied by the caller).
#[derive(Clone)]
pub struct ProfileExtractor {
    sources: Vec<Arc<dyn ProfileSource>>,
    keep_rejections: bool,
}

impl ProfileExtractor {
    /// Extractor over the built-in rule table.
    pub fn new() -> Self {
        Self::with_rules(RuleTable::builtin().clone())
    }

    /// Extractor over a specific rule table.
    pub fn with_rules(rules: RuleTable) -> Self {
        Self {
            sources: vec![Arc::new(rules)],
            keep_rejections: true,
        }
    }

    /// Append a lower-priority source.
    pub fn with_source(mut self, source: Arc<dyn ProfileSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Keep normalization rejections in the produced profile.
    pub fn with_rejections(mut self, keep: bool) -> Self {
        self.keep_rejections = keep;
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, text: &str) -> ExtractedProfile {
        let start = Instant::now();
        info!("Extracting profile from {} characters of text", text.len());

        let profile = ExtractedProfile::merge(self.sources.iter().map(|source| {
            let partial = source.extract(text);
            debug!("Source {} produced {} fields", source.name(), partial.len());
            partial
        }));

        let profile = if self.keep_rejections {
            profile
        } else {
            profile.without_rejections()
        };

        debug!(
            "Extracted {} fields ({} rejected captures) in {:?}",
            profile.len(),
            profile.rejections().len(),
            start.elapsed()
        );
        profile
    }
}

impl Default for ProfileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a profile with the built-in rule table.
pub fn extract(text: &str) -> ExtractedProfile {
    RuleTable::builtin().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::CanonicalField;
    use crate::models::profile::FieldValue;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    const APPLICATION_FORM: &str = r#"
    Student Information Form

    Name: John Michael Smith
    Date of Birth: 05/15/2005
    Email: john.smith@email.com
    Phone: (555) 123-4567

    Address:
    123 Main Street
    Apartment 4B
    New York, NY 10001
    United States

    Academic Information:
    High School: Lincoln High School
    Graduation Year: 2023
    GPA: 3.85
    SAT Score: 1450
    ACT Score: 32

    Intended Major: Computer Science

    Extracurricular Activities:
    - President, Robotics Club
    - Varsity Soccer Team Captain
    - Volunteer, Local Food Bank (200+ hours)
    "#;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_short_student_record() {
        let profile = extract(
            "Student: John Smith\nEmail: john.smith@email.com\nGPA: 3.85\nSAT Score: 1450",
        );

        assert_eq!(profile.value(CanonicalField::FirstName), Some(&text("John")));
        assert_eq!(profile.value(CanonicalField::LastName), Some(&text("Smith")));
        assert_eq!(
            profile.value(CanonicalField::Email),
            Some(&text("john.smith@email.com"))
        );
        assert_eq!(
            profile.value(CanonicalField::Gpa),
            Some(&FieldValue::Decimal(Decimal::from_str("3.85").unwrap()))
        );
        assert_eq!(
            profile.value(CanonicalField::SatScore),
            Some(&FieldValue::Integer(1450))
        );
        assert!(!profile.contains(CanonicalField::MiddleName));
    }

    #[test]
    fn test_unparsable_gpa_is_absent() {
        let profile = extract("GPA: N/A");
        assert!(!profile.contains(CanonicalField::Gpa));
        assert!(profile
            .rejections()
            .iter()
            .any(|r| r.field == CanonicalField::Gpa));
    }

    #[test]
    fn test_full_application_form() {
        let profile = extract(APPLICATION_FORM);

        let expected: BTreeMap<CanonicalField, FieldValue> = [
            (CanonicalField::FirstName, text("John")),
            (CanonicalField::MiddleName, text("Michael")),
            (CanonicalField::LastName, text("Smith")),
            (CanonicalField::Email, text("john.smith@email.com")),
            (CanonicalField::Phone, text("5551234567")),
            (
                CanonicalField::DateOfBirth,
                FieldValue::Date(NaiveDate::from_ymd_opt(2005, 5, 15).unwrap()),
            ),
            (CanonicalField::AddressLine1, text("123 Main Street")),
            (CanonicalField::AddressLine2, text("Apartment 4B")),
            (CanonicalField::City, text("New York")),
            (CanonicalField::State, text("NY")),
            (CanonicalField::PostalCode, text("10001")),
            (CanonicalField::Country, text("United States")),
            (CanonicalField::HighSchoolName, text("Lincoln High School")),
            (CanonicalField::GraduationYear, FieldValue::Integer(2023)),
            (
                CanonicalField::Gpa,
                FieldValue::Decimal(Decimal::from_str("3.85").unwrap()),
            ),
            (CanonicalField::SatScore, FieldValue::Integer(1450)),
            (CanonicalField::ActScore, FieldValue::Integer(32)),
            (CanonicalField::IntendedMajor, text("Computer Science")),
            (
                CanonicalField::Extracurriculars,
                text("President, Robotics Club; Varsity Soccer Team Captain; Volunteer, Local Food Bank (200+ hours)"),
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(profile.values(), expected);
    }

    #[test]
    fn test_empty_and_garbage_text() {
        assert!(extract("").is_empty());
        let profile = extract("\u{0}\u{fffd}::: ::\n\n\t@@@ GPA:: SAT");
        assert!(!profile.contains(CanonicalField::Gpa));
        assert!(!profile.contains(CanonicalField::SatScore));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        assert_eq!(extract(APPLICATION_FORM), extract(APPLICATION_FORM));
    }

    #[test]
    fn test_labeled_gpa_beats_bare_number() {
        let profile = extract("Version 2.10 of the transcript\nGPA: 3.60");
        let gpa = profile.get(CanonicalField::Gpa).unwrap();
        assert_eq!(gpa.value, FieldValue::Decimal(Decimal::from_str("3.60").unwrap()));
        assert_eq!(gpa.rule, "gpa/labeled");
    }

    struct FixedSource(&'static str, ExtractedProfile);

    impl ProfileSource for FixedSource {
        fn name(&self) -> &str {
            self.0
        }

        fn extract(&self, _text: &str) -> ExtractedProfile {
            self.1.clone()
        }
    }

    #[test]
    fn test_extra_source_fills_gaps_only() {
        let ai_profile = {
            let mut fields = BTreeMap::new();
            for (field, value) in [
                (CanonicalField::Email, "other@example.com"),
                (CanonicalField::Gender, "Female"),
            ] {
                fields.insert(
                    field,
                    crate::models::profile::ExtractedField {
                        value: text(value),
                        rule: format!("{}/llm", field),
                        source: "ai".to_string(),
                        matched: value.to_string(),
                    },
                );
            }
            ExtractedProfile::from_parts(fields, Vec::new())
        };

        let extractor =
            ProfileExtractor::new().with_source(Arc::new(FixedSource("ai", ai_profile)));
        assert_eq!(extractor.source_names(), vec!["rules", "ai"]);

        let profile = extractor.extract("Email: jane@school.edu");
        assert_eq!(profile.value(CanonicalField::Email), Some(&text("jane@school.edu")));
        assert_eq!(profile.get(CanonicalField::Email).unwrap().source, "rules");
        assert_eq!(profile.get(CanonicalField::Gender).unwrap().source, "ai");
    }

    #[test]
    fn test_rejections_can_be_dropped() {
        let profile = ProfileExtractor::new().with_rejections(false).extract("GPA: N/A");
        assert!(profile.is_empty());
        assert!(profile.rejections().is_empty());
    }
}
