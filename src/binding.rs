//! Binding layer: which elements carry conditions, which fields they listen
//! to, and the reset → evaluate → apply cycle that runs when those fields
//! change.

use std::collections::BTreeMap;
use std::time::Instant;

use itertools::Itertools;
use tracing::{debug, info};

use crate::context::Settings;
use crate::debounce::Debouncer;
use crate::engine::{Action, ActionResult, Evaluator};
use crate::fields::{self, FieldContext};

pub type ElementId = usize;

/// Attribute access on the host markup.
pub trait Markup {
    fn elements_with_attr(&self, name: &str) -> Vec<ElementId>;
    fn attr(&self, el: ElementId, name: &str) -> Option<String>;
    fn set_attr(&mut self, el: ElementId, name: &str, value: &str);
    fn remove_attr(&mut self, el: ElementId, name: &str);
}

/// Applies evaluator output to an element.
pub trait ActionSink {
    fn apply(&mut self, el: ElementId, action: &Action);
}

/// Everything the binding layer needs from its host.
pub trait Host: Markup + FieldContext + ActionSink {}

impl<T: Markup + FieldContext + ActionSink> Host for T {}

/// What an element looked like when it was bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub raw: String,
    pub reset_raw: Option<String>,
    /// First-encounter order, no duplicates.
    pub referenced_fields: Vec<String>,
    pub saved_style: Option<String>,
}

impl ConditionSpec {
    pub fn capture<M: Markup + ?Sized>(markup: &M, el: ElementId, settings: &Settings) -> Option<Self> {
        let raw = markup.attr(el, &settings.conditions_attr)?;
        let referenced_fields = fields::extract_fields(&raw).into_iter().unique().collect();
        Some(Self {
            reset_raw: markup.attr(el, &settings.resets_attr),
            saved_style: markup.attr(el, "style"),
            referenced_fields,
            raw,
        })
    }
}

/// Listener registered for one referenced field.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub field: String,
    /// Namespaced event names, e.g. `change.dataDisplay`.
    pub events: Vec<String>,
}

impl Trigger {
    /// `event` may be bare (`change`) or namespaced (`change.dataDisplay`).
    pub fn matches(&self, control_name: &str, event: &str) -> bool {
        control_name.contains(&self.field)
            && self
                .events
                .iter()
                .any(|e| e == event || e.split('.').next() == Some(event))
    }
}

struct Binding {
    spec: ConditionSpec,
    triggers: Vec<Trigger>,
    debouncer: Debouncer,
}

/// Registry of bound elements, keyed by element id.
pub struct DataDisplay {
    settings: Settings,
    evaluator: Evaluator,
    bindings: BTreeMap<ElementId, Binding>,
}

impl DataDisplay {
    pub fn new(settings: Settings) -> Self {
        Self::with_evaluator(settings, Evaluator::default())
    }

    pub fn with_evaluator(settings: Settings, evaluator: Evaluator) -> Self {
        Self {
            settings,
            evaluator,
            bindings: BTreeMap::new(),
        }
    }

    pub fn is_bound(&self, el: ElementId) -> bool {
        self.bindings.contains_key(&el)
    }

    pub fn bound(&self) -> Vec<ElementId> {
        self.bindings.keys().copied().collect()
    }

    pub fn spec(&self, el: ElementId) -> Option<&ConditionSpec> {
        self.bindings.get(&el).map(|b| &b.spec)
    }

    pub fn triggers(&self, el: ElementId) -> &[Trigger] {
        self.bindings
            .get(&el)
            .map(|b| b.triggers.as_slice())
            .unwrap_or_default()
    }

    /// Binds every element carrying the conditions attribute that is not
    /// bound yet. Elements referencing a field with no matching control are
    /// left alone. Returns the number of newly bound elements.
    pub fn bind<H: Host>(&mut self, host: &mut H) -> usize {
        let mut bound = 0;
        for el in host.elements_with_attr(&self.settings.conditions_attr) {
            if self.bindings.contains_key(&el) {
                continue;
            }
            let Some(spec) = ConditionSpec::capture(&*host, el, &self.settings) else {
                continue;
            };
            if let Some(missing) = spec
                .referenced_fields
                .iter()
                .find(|f| host.values(f).is_empty())
            {
                debug!(element = el, field = %missing, "no control for field, element not bound");
                continue;
            }

            let events = self.settings.event_names();
            let triggers = spec
                .referenced_fields
                .iter()
                .map(|field| Trigger {
                    field: field.clone(),
                    events: events.clone(),
                })
                .collect();
            let debouncer = Debouncer::new(self.settings.debounce())
                .leading(self.settings.debounce_leading);
            self.bindings.insert(
                el,
                Binding {
                    spec,
                    triggers,
                    debouncer,
                },
            );
            bound += 1;

            if self.settings.init_fire {
                self.refresh(host, el);
            } else {
                let actions = self.reset_actions(&*host, el);
                apply_all(host, el, &actions);
            }
        }
        info!(bound, total = self.bindings.len(), "bound conditional elements");
        bound
    }

    /// Signals that control `control_name` fired `event`. Matching elements
    /// have their debounce re-armed; leading-edge ones run immediately.
    /// Returns how many elements ran now.
    pub fn notify<H: Host>(&mut self, host: &mut H, control_name: &str, event: &str, now: Instant) -> usize {
        let mut immediate = Vec::new();
        for (el, binding) in self.bindings.iter_mut() {
            if binding.triggers.iter().any(|t| t.matches(control_name, event))
                && binding.debouncer.trigger(now)
            {
                immediate.push(*el);
            }
        }
        for el in &immediate {
            self.refresh(host, *el);
        }
        immediate.len()
    }

    /// Runs every element whose quiescence window has elapsed.
    pub fn poll<H: Host>(&mut self, host: &mut H, now: Instant) -> usize {
        let due: Vec<ElementId> = self
            .bindings
            .iter_mut()
            .filter_map(|(el, b)| b.debouncer.poll(now).then_some(*el))
            .collect();
        for el in &due {
            self.refresh(host, *el);
        }
        due.len()
    }

    /// Runs every pending trailing call without waiting for its window.
    pub fn flush<H: Host>(&mut self, host: &mut H) -> usize {
        let due: Vec<ElementId> = self
            .bindings
            .iter_mut()
            .filter_map(|(el, b)| b.debouncer.flush().then_some(*el))
            .collect();
        for el in &due {
            self.refresh(host, *el);
        }
        due.len()
    }

    /// Reset, evaluate and apply for one bound element.
    pub fn refresh<H: Host>(&self, host: &mut H, el: ElementId) {
        let Some(binding) = self.bindings.get(&el) else {
            return;
        };
        let mut actions = self.reset_actions(&*host, el);
        actions.extend(self.evaluator.evaluate(&binding.spec.raw, &*host));
        debug!(element = el, actions = actions.len(), "applying actions");
        apply_all(host, el, &actions);
    }

    fn reset_actions<H: Host>(&self, host: &H, el: ElementId) -> ActionResult {
        match self.bindings.get(&el) {
            Some(binding) => self.evaluator.reset(binding.spec.reset_raw.as_deref(), host),
            None => ActionResult::new(),
        }
    }

    /// Unbinds everything and puts back the condition, reset and style
    /// attributes exactly as they were captured.
    pub fn destroy<H: Host>(&mut self, host: &mut H) {
        let bindings = std::mem::take(&mut self.bindings);
        let count = bindings.len();
        for (el, binding) in bindings {
            let spec = binding.spec;
            restore_attr(host, el, &self.settings.conditions_attr, Some(spec.raw.as_str()));
            restore_attr(host, el, &self.settings.resets_attr, spec.reset_raw.as_deref());
            restore_attr(host, el, "style", spec.saved_style.as_deref());
        }
        info!(count, "destroyed bindings");
    }

    /// Tears down and binds again under new settings.
    pub fn rebind<H: Host>(&mut self, host: &mut H, settings: Settings) -> usize {
        self.destroy(host);
        self.settings = settings;
        self.bind(host)
    }
}

fn apply_all<S: ActionSink + ?Sized>(sink: &mut S, el: ElementId, actions: &[Action]) {
    for action in actions {
        sink.apply(el, action);
    }
}

fn restore_attr<M: Markup + ?Sized>(markup: &mut M, el: ElementId, name: &str, value: Option<&str>) {
    match value {
        Some(v) => markup.set_attr(el, name, v),
        None => markup.remove_attr(el, name),
    }
}
