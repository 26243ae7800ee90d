//! Per-form field selector declarations.

use std::collections::{BTreeMap, HashSet};

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::field::{CanonicalField, FieldType};

/// What a configuration declares about one field's control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelector {
    /// CSS selector tried before any heuristic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// A missing explicit selector ends resolution instead of falling through.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exact: bool,
    /// Label texts tried before the alias table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Placeholder texts tried before the alias table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<String>,
    /// `type` attribute used by the attribute strategy's fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// How the filler should interact with the control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
}

impl FieldSelector {
    /// An explicit CSS selector.
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Self::default()
        }
    }

    fn merge(&mut self, field: CanonicalField, other: FieldSelector) -> Result<(), ConfigError> {
        if let Some(selector) = other.selector {
            let selector = selector.trim().to_string();
            match &self.selector {
                Some(existing) if *existing != selector => {
                    return Err(ConfigError::ConflictingSelectors {
                        field: field.to_string(),
                        first: existing.clone(),
                        second: selector,
                    });
                }
                _ => self.selector = Some(selector),
            }
        }

        self.exact |= other.exact;

        for label in other.labels {
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
        for placeholder in other.placeholders {
            if !self.placeholders.contains(&placeholder) {
                self.placeholders.push(placeholder);
            }
        }

        merge_single(field, "input type", &mut self.input_type, other.input_type)?;
        merge_single(field, "field type", &mut self.field_type, other.field_type)?;
        Ok(())
    }
}

fn merge_single<T>(
    field: CanonicalField,
    what: &str,
    slot: &mut Option<T>,
    value: Option<T>,
) -> Result<(), ConfigError>
where
    T: PartialEq + std::fmt::Debug,
{
    match (slot.as_ref(), value) {
        (Some(existing), Some(value)) if *existing != value => Err(ConfigError::Malformed {
            what: format!("{} of {}", what, field),
            reason: format!("declared as both {:?} and {:?}", existing, value),
        }),
        (_, Some(value)) => {
            *slot = Some(value);
            Ok(())
        }
        (_, None) => Ok(()),
    }
}

/// Fields filled positionally inside one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub name: String,
    /// Members in the order their controls appear.
    pub members: Vec<CanonicalField>,
    /// CSS selector of the element holding the controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Text of the label or legend heading the controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Validated selector declarations for one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldSelectorSpec {
    fields: BTreeMap<CanonicalField, FieldSelector>,
    groups: Vec<FieldGroup>,
}

impl FieldSelectorSpec {
    pub fn builder() -> FieldSelectorSpecBuilder {
        FieldSelectorSpecBuilder::default()
    }

    /// A spec holding only explicit selectors.
    pub fn from_selectors<I, S>(selectors: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (CanonicalField, S)>,
        S: Into<String>,
    {
        selectors
            .into_iter()
            .fold(Self::builder(), |builder, (field, selector)| {
                builder.selector(field, selector)
            })
            .build()
    }

    pub fn get(&self, field: CanonicalField) -> Option<&FieldSelector> {
        self.fields.get(&field)
    }

    pub fn selector(&self, field: CanonicalField) -> Option<&str> {
        self.get(field).and_then(|f| f.selector.as_deref())
    }

    pub fn field_type(&self, field: CanonicalField) -> Option<FieldType> {
        self.get(field).and_then(|f| f.field_type)
    }

    /// The group a field belongs to, with the field's position in it.
    pub fn group_of(&self, field: CanonicalField) -> Option<(&FieldGroup, usize)> {
        self.groups.iter().find_map(|group| {
            group
                .members
                .iter()
                .position(|m| *m == field)
                .map(|pos| (group, pos))
        })
    }

    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    /// Fields with an explicit selector, in canonical order.
    pub fn mapped_fields(&self) -> Vec<CanonicalField> {
        self.fields
            .iter()
            .filter(|(_, f)| f.selector.is_some())
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }
}

/// Collects declarations; conflicts are reported by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct FieldSelectorSpecBuilder {
    entries: Vec<(CanonicalField, FieldSelector)>,
    groups: Vec<FieldGroup>,
}

impl FieldSelectorSpecBuilder {
    pub fn selector(self, field: CanonicalField, selector: impl Into<String>) -> Self {
        self.hint(field, FieldSelector::css(selector))
    }

    /// A selector whose absence ends resolution for the field.
    pub fn exact_selector(self, field: CanonicalField, selector: impl Into<String>) -> Self {
        self.hint(
            field,
            FieldSelector {
                exact: true,
                ..FieldSelector::css(selector)
            },
        )
    }

    pub fn label(self, field: CanonicalField, text: impl Into<String>) -> Self {
        self.hint(
            field,
            FieldSelector {
                labels: vec![text.into()],
                ..FieldSelector::default()
            },
        )
    }

    pub fn placeholder(self, field: CanonicalField, text: impl Into<String>) -> Self {
        self.hint(
            field,
            FieldSelector {
                placeholders: vec![text.into()],
                ..FieldSelector::default()
            },
        )
    }

    pub fn input_type(self, field: CanonicalField, input_type: impl Into<String>) -> Self {
        self.hint(
            field,
            FieldSelector {
                input_type: Some(input_type.into()),
                ..FieldSelector::default()
            },
        )
    }

    pub fn field_type(self, field: CanonicalField, field_type: FieldType) -> Self {
        self.hint(
            field,
            FieldSelector {
                field_type: Some(field_type),
                ..FieldSelector::default()
            },
        )
    }

    /// Any combination of declarations for a field.
    pub fn hint(mut self, field: CanonicalField, hint: FieldSelector) -> Self {
        self.entries.push((field, hint));
        self
    }

    pub fn group(mut self, group: FieldGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn build(self) -> Result<FieldSelectorSpec, ConfigError> {
        let mut fields: BTreeMap<CanonicalField, FieldSelector> = BTreeMap::new();
        for (field, hint) in self.entries {
            fields.entry(field).or_default().merge(field, hint)?;
        }

        for (field, entry) in &fields {
            match entry.selector.as_deref() {
                Some(selector) => validate_css(field.as_str(), selector)?,
                None if entry.exact => {
                    return Err(ConfigError::Malformed {
                        what: format!("selector entry for {}", field),
                        reason: "exact matching requires a selector".to_string(),
                    });
                }
                None => {}
            }
        }

        validate_groups(&self.groups)?;

        Ok(FieldSelectorSpec {
            fields,
            groups: self.groups,
        })
    }
}

fn validate_css(owner: &str, selector: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidSelector {
        field: owner.to_string(),
        selector: selector.to_string(),
    };
    if selector.trim().is_empty() {
        return Err(invalid());
    }
    Selector::parse(selector).map_err(|_| invalid())?;
    Ok(())
}

fn validate_groups(groups: &[FieldGroup]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut owners: BTreeMap<CanonicalField, &str> = BTreeMap::new();

    for group in groups {
        let invalid = |reason: String| ConfigError::InvalidFieldGroup {
            group: group.name.clone(),
            reason,
        };

        if group.name.trim().is_empty() {
            return Err(invalid("group has no name".to_string()));
        }
        if !names.insert(group.name.as_str()) {
            return Err(invalid("declared more than once".to_string()));
        }
        if group.members.is_empty() {
            return Err(invalid("group has no members".to_string()));
        }
        if group.container.is_none() && group.label.is_none() {
            return Err(invalid("needs a container selector or a label".to_string()));
        }
        if let Some(container) = &group.container {
            validate_css(&format!("group {}", group.name), container)?;
        }

        for member in &group.members {
            if let Some(owner) = owners.insert(*member, &group.name) {
                return Err(if owner == group.name {
                    invalid(format!("{} is listed twice", member))
                } else {
                    invalid(format!("{} already belongs to group {}", member, owner))
                });
            }
        }
    }
    Ok(())
}
