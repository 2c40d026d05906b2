use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Binding-layer settings. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Suffix appended to every bound event name, e.g. `change.dataDisplay`.
    pub event_namespace: String,
    /// Attribute holding the condition text.
    pub conditions_attr: String,
    /// Attribute holding the reset script.
    pub resets_attr: String,
    /// Evaluate conditions once right after binding.
    pub init_fire: bool,
    /// Also react to `keyup`, not only `change`.
    pub key_events_fire: bool,
    /// Quiescence window before a triggered element is re-evaluated.
    pub debounce_ms: u64,
    /// Fire on the first signal of a burst instead of after it.
    pub debounce_leading: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            event_namespace: ".dataDisplay".into(),
            conditions_attr: "data-display".into(),
            resets_attr: "data-display-resets".into(),
            init_fire: true,
            key_events_fire: true,
            debounce_ms: 0,
            debounce_leading: false,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Namespaced event names a trigger is bound to.
    pub fn event_names(&self) -> Vec<String> {
        let mut events = vec![format!("change{}", self.event_namespace)];
        if self.key_events_fire {
            events.push(format!("keyup{}", self.event_namespace));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let s = Settings::from_json(r#"{"debounce_ms": 250, "key_events_fire": false}"#).unwrap();
        assert_eq!(s.debounce(), Duration::from_millis(250));
        assert_eq!(s.conditions_attr, "data-display");
        assert_eq!(s.event_names(), vec!["change.dataDisplay"]);
        assert_eq!(
            Settings::default().event_names(),
            vec!["change.dataDisplay", "keyup.dataDisplay"]
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Settings::from_json("{\"init_fire\": \"yes\"}").is_err());
    }
}
