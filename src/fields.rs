//! Field placeholders: discovery, value lookup and escaping.
//!
//! A placeholder is `{name}`. Its value comes from the form controls whose
//! `name` *contains* `name`, so `{age}` also picks up a control called
//! `stage`. That breadth is long-standing behaviour that existing markup
//! relies on; keep field names distinct to avoid collisions.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::comparison::{number_to_string, string_to_number};

// left alone by `encodeURIComponent` on top of what `urlencoding` keeps
const URI_MARKS: [char; 5] = ['!', '\'', '(', ')', '*'];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Live field values, as seen from the element being evaluated.
pub trait FieldContext {
    /// Values of every control whose name contains `field`, in document order.
    fn values(&self, field: &str) -> Vec<String>;

    /// Value of the first checked checkbox/radio whose name contains `field`.
    fn checked_value(&self, field: &str) -> Option<String>;

    /// The checked control wins, otherwise the first matching control.
    fn resolve(&self, field: &str) -> Option<String> {
        self.checked_value(field)
            .or_else(|| self.values(field).into_iter().next())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Text,
    Checkbox,
    Radio,
}

impl ControlKind {
    pub fn is_checkable(self) -> bool {
        matches!(self, ControlKind::Checkbox | ControlKind::Radio)
    }
}

/// One form control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub kind: ControlKind,
    #[serde(default)]
    pub checked: bool,
}

impl Control {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn checkable(
        kind: ControlKind,
        name: impl Into<String>,
        value: impl Into<String>,
        checked: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            checked,
        }
    }
}

/// In-memory set of controls, the simplest `FieldContext`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Form {
    pub controls: Vec<Control>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    /// Text controls from `(name, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            controls: pairs
                .into_iter()
                .map(|(n, v)| Control::text(n, v))
                .collect(),
        }
    }

    pub fn matching<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Control> + 'a {
        self.controls.iter().filter(move |c| c.name.contains(field))
    }

    pub fn has_match(&self, field: &str) -> bool {
        self.matching(field).next().is_some()
    }

    /// Sets the value of a text control, or checks the checkable control
    /// carrying `value` (unchecking radio siblings). Returns false when no
    /// control has exactly this name.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let mut touched = false;
        for control in self.controls.iter_mut().filter(|c| c.name == name) {
            match control.kind {
                ControlKind::Text => control.value = value.to_string(),
                ControlKind::Checkbox => {
                    if control.value == value {
                        control.checked = !control.checked;
                    }
                }
                ControlKind::Radio => control.checked = control.value == value,
            }
            touched = true;
        }
        touched
    }
}

impl FieldContext for Form {
    fn values(&self, field: &str) -> Vec<String> {
        self.matching(field).map(|c| c.value.clone()).collect()
    }

    fn checked_value(&self, field: &str) -> Option<String> {
        self.matching(field)
            .find(|c| c.kind.is_checkable() && c.checked)
            .map(|c| c.value.clone())
    }
}

/// Every `{name}` placeholder in order of appearance, duplicates kept.
pub fn extract_fields(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Renders a field value as an expression literal: numeric-looking values
/// become numbers, everything else a percent-encoded, double-quoted string.
/// Encoding follows `encodeURIComponent`, so the output holds no double
/// quote, backslash, brace, `;` or `:`.
pub fn escape_value(raw: &str) -> String {
    if looks_numeric(raw) {
        number_to_string(string_to_number(raw))
    } else {
        format!("\"{}\"", encode_component(raw))
    }
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (kept, run) in &raw.chars().chunk_by(|c| URI_MARKS.contains(c)) {
        let run: String = run.collect();
        if kept {
            out.push_str(&run);
        } else {
            out.push_str(&urlencoding::encode(&run));
        }
    }
    out
}

fn looks_numeric(raw: &str) -> bool {
    !raw.trim().is_empty() && string_to_number(raw).is_finite()
}

/// Replaces every `{field}` of the listed fields with its escaped live value.
/// Unresolved fields keep their placeholder.
pub fn substitute_fields(text: &str, fields: &[String], ctx: &dyn FieldContext) -> String {
    let mut out = text.to_string();
    for field in fields {
        let Some(value) = ctx.resolve(field) else {
            trace!(field = %field, "no control for field, placeholder kept");
            continue;
        };
        // plain-text replace: field names are never interpreted as a pattern
        let placeholder = format!("{{{field}}}");
        out = out.replace(&placeholder, &escape_value(&value));
    }
    out
}
