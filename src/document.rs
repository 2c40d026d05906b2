//! In-memory host: a form plus a flat list of elements with attributes.
//!
//! Effect scripts are not executed. The handful of `$this.*` statements that
//! conditions use in practice (`show`, `hide`, `css`, `attr`) are applied to
//! the element's attributes; every script is recorded in `applied`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::{ActionSink, ElementId, Markup};
use crate::engine::{Action, ActionKind};
use crate::errors::Result;
use crate::fields::{FieldContext, Form};

static TOGGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$this\.(show|hide)\(\s*\)$").expect("toggle pattern is valid")
});

static SETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\$this\.(css|attr)\(\s*(?:'([^']*)'|"([^"]*)")\s*,\s*(?:'([^']*)'|"([^"]*)"|([^'",()]+?))\s*\)$"#,
    )
    .expect("setter pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Label used to look the element up; not an attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Effect scripts received, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub form: Form,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Document {
    pub fn new(form: Form) -> Self {
        Self {
            form,
            elements: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Appends an element built from `(name, value)` attribute pairs.
    pub fn push(&mut self, id: &str, attrs: &[(&str, &str)]) -> ElementId {
        self.elements.push(Element {
            id: Some(id.to_string()),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            applied: Vec::new(),
        });
        self.elements.len() - 1
    }

    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
    }

    /// Visible unless the inline style says `display: none`.
    pub fn is_visible(&self, el: ElementId) -> bool {
        self.style_value(el, "display").as_deref() != Some("none")
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        self.form.set(name, value)
    }

    pub fn style_value(&self, el: ElementId, prop: &str) -> Option<String> {
        let style = self.attr(el, "style")?;
        parse_style(&style)
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(prop))
            .map(|(_, v)| v)
    }

    pub fn set_style(&mut self, el: ElementId, prop: &str, value: &str) {
        let mut decls = parse_style(&self.attr(el, "style").unwrap_or_default());
        match decls.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(prop)) {
            Some(decl) => decl.1 = value.to_string(),
            None => decls.push((prop.to_string(), value.to_string())),
        }
        let style = decls.iter().map(|(k, v)| format!("{k}: {v};")).join(" ");
        self.set_attr(el, "style", &style);
    }

    fn run_statement(&mut self, el: ElementId, statement: &str) {
        if let Some(caps) = TOGGLE.captures(statement) {
            let display = if &caps[1] == "show" { "block" } else { "none" };
            self.set_style(el, "display", display);
        } else if let Some(caps) = SETTER.captures(statement) {
            let key = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            let value = caps
                .get(4)
                .or_else(|| caps.get(5))
                .or_else(|| caps.get(6))
                .map_or("", |m| m.as_str());
            if &caps[1] == "css" {
                self.set_style(el, key, value);
            } else {
                self.set_attr(el, key, value);
            }
        } else if statement != "true" {
            debug!(element = el, statement, "effect statement not understood, recorded only");
        }
    }
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
        })
        .collect()
}

impl Markup for Document {
    fn elements_with_attr(&self, name: &str) -> Vec<ElementId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.attrs.contains_key(name))
            .map(|(i, _)| i)
            .collect()
    }

    fn attr(&self, el: ElementId, name: &str) -> Option<String> {
        self.elements.get(el)?.attrs.get(name).cloned()
    }

    fn set_attr(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(e) = self.elements.get_mut(el) {
            e.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attr(&mut self, el: ElementId, name: &str) {
        if let Some(e) = self.elements.get_mut(el) {
            e.attrs.remove(name);
        }
    }
}

impl FieldContext for Document {
    fn values(&self, field: &str) -> Vec<String> {
        self.form.values(field)
    }

    fn checked_value(&self, field: &str) -> Option<String> {
        self.form.checked_value(field)
    }
}

impl ActionSink for Document {
    fn apply(&mut self, el: ElementId, action: &Action) {
        match action.kind {
            ActionKind::Show => self.set_style(el, "display", "block"),
            ActionKind::Hide => self.set_style(el, "display", "none"),
            ActionKind::Effect => {
                if let Some(e) = self.elements.get_mut(el) {
                    e.applied.push(action.script.clone());
                }
                // reset scripts arrive whole, effect statements one at a time
                for statement in action.script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                    self.run_statement(el, statement);
                }
            }
        }
    }
}
