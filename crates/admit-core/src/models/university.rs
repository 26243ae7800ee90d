//! Per-university portal configuration.
//!
//! One JSON file per university describes its URLs and, for the signup and
//! application forms, which CSS selector holds each canonical field.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::field::{CanonicalField, FieldType};
use crate::error::{ConfigError, Result};
use crate::resolve::spec::{FieldGroup, FieldSelector, FieldSelectorSpec, FieldSelectorSpecBuilder};

/// Which of a university's forms a mapping describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Signup,
    Application,
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signup => f.write_str("signup"),
            Self::Application => f.write_str("application"),
        }
    }
}

/// Field name → selector pairs in file order.
///
/// Repeated keys are kept so that two selectors declared for one field are
/// reported instead of the later one silently winning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping(Vec<(String, String)>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, selector: impl Into<String>) {
        self.0.push((field.into(), selector.into()));
    }

    /// First selector declared for a field name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for FieldMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = FieldMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to CSS selectors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    pairs.push((k, v));
                }
                Ok(FieldMapping(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}

/// One page of a multi-page application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormPage {
    pub page_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Canonical field names filled on this page.
    pub fields: Vec<String>,
    /// Selector of the button leading to the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_button: Option<String>,
}

/// A university's application portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniversityConfig {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signup_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
    pub requires_email_verification: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
    pub signup_field_mapping: FieldMapping,
    pub field_mapping: FieldMapping,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_types: BTreeMap<String, FieldType>,
    /// Label, placeholder and type hints for the resolver's heuristics.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_hints: BTreeMap<String, FieldSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_groups: Vec<FieldGroup>,
    pub multi_page: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<FormPage>,
}

impl UniversityConfig {
    pub fn from_json(json: &str) -> std::result::Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
            what: "university configuration".to_string(),
            reason: e.to_string(),
        })
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn mapping(&self, kind: FormKind) -> &FieldMapping {
        match kind {
            FormKind::Signup => &self.signup_field_mapping,
            FormKind::Application => &self.field_mapping,
        }
    }

    /// Declarations for one of the university's forms, open for further
    /// additions before validation.
    pub fn spec_builder(
        &self,
        kind: FormKind,
    ) -> std::result::Result<FieldSelectorSpecBuilder, ConfigError> {
        let mut builder = FieldSelectorSpec::builder();

        for (name, selector) in self.mapping(kind).iter() {
            builder = builder.selector(name.parse()?, selector);
        }
        for (name, hint) in &self.field_hints {
            builder = builder.hint(name.parse()?, hint.clone());
        }
        for (name, field_type) in &self.field_types {
            builder = builder.field_type(name.parse()?, *field_type);
        }
        for group in &self.field_groups {
            builder = builder.group(group.clone());
        }

        Ok(builder)
    }

    /// Validated selector declarations for one of the university's forms.
    pub fn selector_spec(&self, kind: FormKind) -> std::result::Result<FieldSelectorSpec, ConfigError> {
        self.spec_builder(kind)?.build()
    }

    /// Canonical fields filled on a page, in declared order.
    pub fn page_fields(&self, page_number: u32) -> std::result::Result<Vec<CanonicalField>, ConfigError> {
        let page = self
            .pages
            .iter()
            .find(|p| p.page_number == page_number)
            .ok_or_else(|| ConfigError::Malformed {
                what: format!("pages of {}", self.name),
                reason: format!("no page {}", page_number),
            })?;
        page.fields.iter().map(|f| f.parse()).collect()
    }

    /// Check both forms and every page declaration.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.selector_spec(FormKind::Signup)?;
        self.selector_spec(FormKind::Application)?;
        for page in &self.pages {
            self.page_fields(page.page_number)?;
        }
        Ok(())
    }

    /// Starting point for a new university file.
    pub fn template() -> Self {
        let signup = [
            ("first_name", "#firstName"),
            ("last_name", "#lastName"),
            ("email", "#email"),
            ("phone", "#phone"),
            ("password", "#password"),
        ];
        let application = CanonicalField::ALL
            .iter()
            .filter(|f| **f != CanonicalField::Password)
            .map(|f| (f.as_str(), format!("#{}", camel_case(f.as_str()))));
        let field_types = [
            (CanonicalField::DateOfBirth, FieldType::Date),
            (CanonicalField::Gender, FieldType::Select),
            (CanonicalField::State, FieldType::Select),
            (CanonicalField::Country, FieldType::Select),
            (CanonicalField::IntendedMajor, FieldType::Select),
            (CanonicalField::Extracurriculars, FieldType::Textarea),
        ];
        let notes = [
            ("signup_process", "Describe the signup process here"),
            ("special_requirements", "Any CAPTCHA, multi-step, or special requirements"),
            ("testing_notes", "Notes from testing"),
        ];

        Self {
            name: "University Name".to_string(),
            url: "https://university.edu".to_string(),
            signup_url: Some("https://university.edu/signup".to_string()),
            login_url: Some("https://university.edu/login".to_string()),
            application_url: Some("https://university.edu/apply".to_string()),
            email_domain: Some("university.edu".to_string()),
            requires_email_verification: true,
            notes: notes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            signup_field_mapping: signup.into_iter().collect(),
            field_mapping: application.collect(),
            field_types: field_types
                .into_iter()
                .map(|(f, t)| (f.as_str().to_string(), t))
                .collect(),
            field_hints: BTreeMap::new(),
            field_groups: Vec::new(),
            multi_page: false,
            pages: vec![FormPage {
                page_number: 1,
                url: Some("https://university.edu/apply/page1".to_string()),
                fields: vec!["first_name".into(), "last_name".into(), "email".into()],
                next_button: Some("#nextButton".to_string()),
            }],
        }
    }

    /// A portal laid out like the Common Application.
    pub fn common_app_example() -> Self {
        Self {
            name: "Common Application Style University".to_string(),
            url: "https://apply.university.edu".to_string(),
            signup_url: Some("https://apply.university.edu/account/create".to_string()),
            login_url: Some("https://apply.university.edu/login".to_string()),
            application_url: Some("https://apply.university.edu/application".to_string()),
            email_domain: Some("university.edu".to_string()),
            requires_email_verification: true,
            field_mapping: [
                ("first_name", "#profile_first_name"),
                ("last_name", "#profile_last_name"),
                ("email", "#profile_email"),
                ("phone", "#profile_phone"),
                ("date_of_birth", "#profile_birth_date"),
                ("address_line1", "#profile_address_1"),
                ("city", "#profile_city"),
                ("state", "#profile_state"),
                ("postal_code", "#profile_zip"),
            ]
            .into_iter()
            .collect(),
            ..Self::default()
        }
    }

    /// A portal built on the Slate admissions platform.
    pub fn slate_example() -> Self {
        Self {
            name: "Slate-Based University".to_string(),
            url: "https://admissions.university.edu".to_string(),
            signup_url: Some("https://admissions.university.edu/register".to_string()),
            login_url: Some("https://admissions.university.edu/apply".to_string()),
            application_url: Some("https://admissions.university.edu/apply/status".to_string()),
            email_domain: Some("university.edu".to_string()),
            requires_email_verification: true,
            field_mapping: [
                ("first_name", "[name='first']"),
                ("last_name", "[name='last']"),
                ("email", "[name='email']"),
                ("phone", "[name='mobile']"),
                ("date_of_birth", "[name='birthdate']"),
            ]
            .into_iter()
            .collect(),
            ..Self::default()
        }
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
