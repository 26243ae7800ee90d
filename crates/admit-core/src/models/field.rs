//! Canonical student profile fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A fixed semantic slot of the student profile schema.
///
/// Declaration order is the output order of an extracted profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    FirstName,
    MiddleName,
    LastName,
    Email,
    Phone,
    /// Account password; never extracted from documents.
    Password,
    DateOfBirth,
    Gender,
    Nationality,
    AddressLine1,
    AddressLine2,
    City,
    State,
    PostalCode,
    Country,
    HighSchoolName,
    GraduationYear,
    Gpa,
    SatScore,
    ActScore,
    IntendedMajor,
    Extracurriculars,
}

impl CanonicalField {
    /// All fields in declaration order.
    pub const ALL: [CanonicalField; 22] = [
        Self::FirstName,
        Self::MiddleName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Password,
        Self::DateOfBirth,
        Self::Gender,
        Self::Nationality,
        Self::AddressLine1,
        Self::AddressLine2,
        Self::City,
        Self::State,
        Self::PostalCode,
        Self::Country,
        Self::HighSchoolName,
        Self::GraduationYear,
        Self::Gpa,
        Self::SatScore,
        Self::ActScore,
        Self::IntendedMajor,
        Self::Extracurriculars,
    ];

    /// The snake_case name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::MiddleName => "middle_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Password => "password",
            Self::DateOfBirth => "date_of_birth",
            Self::Gender => "gender",
            Self::Nationality => "nationality",
            Self::AddressLine1 => "address_line1",
            Self::AddressLine2 => "address_line2",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postal_code",
            Self::Country => "country",
            Self::HighSchoolName => "high_school_name",
            Self::GraduationYear => "graduation_year",
            Self::Gpa => "gpa",
            Self::SatScore => "sat_score",
            Self::ActScore => "act_score",
            Self::IntendedMajor => "intended_major",
            Self::Extracurriculars => "extracurriculars",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

/// How the form-filling collaborator interacts with a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Password,
    Tel,
    Number,
    Date,
    Select,
    Textarea,
    Checkbox,
    Radio,
}

impl FieldType {
    /// Infer the interaction type from an element's tag and `type` attribute.
    pub fn from_markup(tag: &str, input_type: Option<&str>) -> Self {
        match tag {
            "select" => Self::Select,
            "textarea" => Self::Textarea,
            _ => match input_type.map(|t| t.to_ascii_lowercase()).as_deref() {
                Some("email") => Self::Email,
                Some("password") => Self::Password,
                Some("tel") => Self::Tel,
                Some("number") => Self::Number,
                Some("date") => Self::Date,
                Some("checkbox") => Self::Checkbox,
                Some("radio") => Self::Radio,
                _ => Self::Text,
            },
        }
    }
}
