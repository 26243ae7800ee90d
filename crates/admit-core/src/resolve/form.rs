//! Read-only views of a rendered form.
//!
//! The resolver only ever sees a [`FormView`]. [`HtmlForm`] implements it over
//! a static HTML snapshot (for example the `page.content()` a browser driver
//! hands over) using `scraper`.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::warn;

use super::aliases::words;
use crate::models::field::FieldType;

lazy_static! {
    static ref CONTROLS: Selector = Selector::parse("input, select, textarea").unwrap();
    static ref LABELS: Selector = Selector::parse("label").unwrap();
    static ref GROUP_ANCHORS: Selector = Selector::parse("label, legend").unwrap();
    static ref CSS_IDENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap();
}

/// Input types a user never types into.
const NON_FILLABLE_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

/// A form element as the resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormElement {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Position among the fillable controls, in document order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Selector a browser driver can use to address the element.
    pub selector: String,
    /// Structural `nth-child` path; unique within the snapshot.
    pub path: String,
}

impl FormElement {
    pub fn field_type(&self) -> FieldType {
        FieldType::from_markup(&self.tag, self.input_type.as_deref())
    }

    /// Whether this is a control a user types into or picks from.
    pub fn is_fillable(&self) -> bool {
        is_fillable(&self.tag, self.input_type.as_deref())
    }
}

/// A `<label>` and the control it describes, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormLabel {
    pub text: String,
    pub control: Option<FormElement>,
}

/// A queryable snapshot of a form.
pub trait FormView {
    /// First element matching a CSS selector.
    fn select(&self, selector: &str) -> Option<FormElement>;

    /// Fillable controls in document order.
    fn controls(&self) -> &[FormElement];

    /// Labels in document order.
    fn labels(&self) -> &[FormLabel];

    /// Fillable controls inside a group, located by a container selector or,
    /// failing that, by the text of a label or legend heading it.
    fn group_controls(&self, container: Option<&str>, label: Option<&str>) -> Vec<FormElement>;
}

/// A form snapshot parsed from HTML.
pub struct HtmlForm {
    document: Html,
    controls: Vec<FormElement>,
    labels: Vec<FormLabel>,
}

impl HtmlForm {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let mut controls: Vec<FormElement> = document
            .select(&CONTROLS)
            .filter(|el| fillable_element(el))
            .enumerate()
            .map(|(index, el)| describe(el, Some(index)))
            .collect();
        disambiguate_names(&mut controls);

        let labels = document
            .select(&LABELS)
            .map(|label| FormLabel {
                text: label_text(label),
                control: associated_control(label, &controls),
            })
            .collect();

        Self {
            document,
            controls,
            labels,
        }
    }

    fn lookup(&self, el: ElementRef<'_>) -> FormElement {
        let path = structural_path(el);
        self.controls
            .iter()
            .find(|c| c.path == path)
            .cloned()
            .unwrap_or_else(|| describe(el, None))
    }

    fn controls_within(&self, container: ElementRef<'_>) -> Vec<FormElement> {
        container
            .select(&CONTROLS)
            .filter(|el| fillable_element(el))
            .map(|el| self.lookup(el))
            .collect()
    }
}

impl FormView for HtmlForm {
    fn select(&self, selector: &str) -> Option<FormElement> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring unparsable selector {:?}: {:?}", selector, e);
                return None;
            }
        };
        self.document.select(&parsed).next().map(|el| self.lookup(el))
    }

    fn controls(&self) -> &[FormElement] {
        &self.controls
    }

    fn labels(&self) -> &[FormLabel] {
        &self.labels
    }

    fn group_controls(&self, container: Option<&str>, label: Option<&str>) -> Vec<FormElement> {
        if let Some(css) = container {
            if let Ok(selector) = Selector::parse(css) {
                if let Some(el) = self.document.select(&selector).next() {
                    return self.controls_within(el);
                }
            }
        }

        if let Some(text) = label {
            let wanted = words(text);
            let parent = self
                .document
                .select(&GROUP_ANCHORS)
                .find(|anchor| words(&label_text(*anchor)) == wanted)
                .and_then(|anchor| anchor.parent().and_then(ElementRef::wrap));
            if let Some(parent) = parent {
                return self.controls_within(parent);
            }
        }

        Vec::new()
    }
}

fn is_fillable(tag: &str, input_type: Option<&str>) -> bool {
    match tag {
        "select" | "textarea" => true,
        "input" => !input_type
            .map(|t| NON_FILLABLE_TYPES.contains(&t.to_ascii_lowercase().as_str()))
            .unwrap_or(false),
        _ => false,
    }
}

fn fillable_element(el: &ElementRef<'_>) -> bool {
    is_fillable(el.value().name(), el.value().attr("type"))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn describe(el: ElementRef<'_>, index: Option<usize>) -> FormElement {
    let value = el.value();
    let tag = value.name().to_string();
    let id = non_empty(value.attr("id"));
    let name = non_empty(value.attr("name"));
    let path = structural_path(el);

    let selector = match (&id, &name) {
        (Some(id), _) if CSS_IDENT.is_match(id) => format!("#{}", id),
        (Some(id), _) => format!("[id=\"{}\"]", escape_attr(id)),
        (None, Some(name)) => format!("{}[name=\"{}\"]", tag, escape_attr(name)),
        (None, None) => path.clone(),
    };

    FormElement {
        tag,
        id,
        name,
        input_type: non_empty(value.attr("type")).map(|t| t.to_ascii_lowercase()),
        placeholder: non_empty(value.attr("placeholder")),
        index,
        selector,
        path,
    }
}

/// Name-based selectors must address one control; radio and checkbox groups
/// legitimately share a name and keep it.
fn disambiguate_names(controls: &mut [FormElement]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for control in controls.iter() {
        if control.id.is_some() || matches!(control.input_type.as_deref(), Some("radio" | "checkbox")) {
            continue;
        }
        if let Some(name) = &control.name {
            *counts.entry(name.clone()).or_default() += 1;
        }
    }

    for control in controls.iter_mut() {
        let shared = control.id.is_none()
            && control.name.as_ref().is_some_and(|n| counts.get(n).copied().unwrap_or(0) > 1);
        if shared {
            control.selector = control.path.clone();
        }
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn structural_path(el: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(el);

    while let Some(node) = current {
        let parent = node.parent().and_then(ElementRef::wrap);
        let tag = node.value().name();
        if parent.is_some() {
            let nth = node.prev_siblings().filter(|s| s.value().is_element()).count() + 1;
            segments.push(format!("{}:nth-child({})", tag, nth));
        } else {
            segments.push(tag.to_string());
        }
        current = parent;
    }

    segments.reverse();
    segments.join(" > ")
}

/// Visible text of a label, without the option text of controls nested in it.
fn label_text(label: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in label.descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let inside_control = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "select" | "option" | "textarea"))
        });
        if !inside_control {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Control a label describes: `for`, then nesting, then the next sibling.
fn associated_control(label: ElementRef<'_>, controls: &[FormElement]) -> Option<FormElement> {
    let find = |el: ElementRef<'_>| {
        let path = structural_path(el);
        controls.iter().find(|c| c.path == path).cloned()
    };

    if let Some(target) = label.value().attr("for").map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(control) = controls.iter().find(|c| c.id.as_deref() == Some(target)) {
            return Some(control.clone());
        }
    }

    if let Some(nested) = label.select(&CONTROLS).find(fillable_element) {
        return find(nested);
    }

    let next = label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| !(el.value().name() == "input" && !fillable_element(el)))?;

    if fillable_element(&next) {
        find(next)
    } else if next.value().name() == "label" {
        None
    } else {
        next.select(&CONTROLS).find(fillable_element).and_then(find)
    }
}
