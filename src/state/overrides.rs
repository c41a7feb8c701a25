//! Per-invocation provider option overrides.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Option values supplied for the current prepare invocation.
///
/// Keyed by requirement (its environment variable) and then by provider
/// option name. Interactive submissions accumulate here across loop passes;
/// nothing in this map is written to disk directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserConfigOverrides {
    values: BTreeMap<String, BTreeMap<String, Value>>,
}

impl UserConfigOverrides {
    /// Create an empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for a single option.
    pub fn with(mut self, requirement: &str, option: &str, value: impl Into<Value>) -> Self {
        self.set(requirement, option, value.into());
        self
    }

    /// Look up an override.
    pub fn get(&self, requirement: &str, option: &str) -> Option<&Value> {
        self.values.get(requirement)?.get(option)
    }

    /// Set an override, returning whether the value changed.
    pub fn set(&mut self, requirement: &str, option: &str, value: Value) -> bool {
        let options = self.values.entry(requirement.to_string()).or_default();
        if options.get(option) == Some(&value) {
            return false;
        }
        options.insert(option.to_string(), value);
        true
    }

    /// All overrides for one requirement.
    pub fn for_requirement(&self, requirement: &str) -> Option<&BTreeMap<String, Value>> {
        self.values.get(requirement)
    }

    /// Merge another set of overrides into this one; later values win.
    ///
    /// Returns whether anything changed.
    pub fn merge(&mut self, other: UserConfigOverrides) -> bool {
        let mut changed = false;
        for (requirement, options) in other.values {
            for (option, value) in options {
                changed |= self.set(&requirement, &option, value);
            }
        }
        changed
    }

    /// Whether no overrides are present.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(|options| options.is_empty())
    }

    /// Iterate over `(requirement, options)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Value>)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let overrides = UserConfigOverrides::new();
        assert!(overrides.is_empty());
        assert!(overrides.get("FOO", "value").is_none());
    }

    #[test]
    fn set_reports_changes() {
        let mut overrides = UserConfigOverrides::new();
        assert!(overrides.set("FOO", "value", Value::from("a")));
        assert!(!overrides.set("FOO", "value", Value::from("a")));
        assert!(overrides.set("FOO", "value", Value::from("b")));
        assert_eq!(overrides.get("FOO", "value"), Some(&Value::from("b")));
    }

    #[test]
    fn merge_later_values_win() {
        let mut overrides = UserConfigOverrides::new()
            .with("FOO", "source", "environ")
            .with("BAR", "value", "1");
        let incoming = UserConfigOverrides::new().with("FOO", "source", "variables");

        assert!(overrides.merge(incoming));
        assert_eq!(overrides.get("FOO", "source"), Some(&Value::from("variables")));
        assert_eq!(overrides.get("BAR", "value"), Some(&Value::from("1")));
    }

    #[test]
    fn merging_identical_values_is_not_a_change() {
        let mut overrides = UserConfigOverrides::new().with("FOO", "source", "environ");
        let same = overrides.clone();
        assert!(!overrides.merge(same));
    }

    #[test]
    fn deserializes_from_nested_json() {
        let overrides: UserConfigOverrides =
            serde_json::from_str(r#"{"FOO": {"source": "variables", "value": "x"}}"#).unwrap();
        assert_eq!(overrides.get("FOO", "value"), Some(&Value::from("x")));
        assert_eq!(overrides.for_requirement("FOO").map(|m| m.len()), Some(2));
    }
}
