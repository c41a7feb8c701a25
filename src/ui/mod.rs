//! Channels through which the prepare loop negotiates with a user.
//!
//! When requirements are still unsatisfied, an interactive channel is
//! shown an [`OutstandingSchema`] and answers with a [`UiEvent`]: either a
//! set of option overrides to try, or a stop.
//!
//! - [`HeadlessUi`] never negotiates
//! - [`TerminalUi`] asks at the terminal
//! - [`ChannelUi`] forwards to another thread over `mpsc`
//! - [`ScriptedUi`] replays canned answers in tests
//!
//! # Example
//!
//! ```
//! use rigup::ui::{HeadlessUi, UiChannel};
//!
//! let ui = HeadlessUi::new();
//! assert!(!ui.is_interactive());
//! ```

pub mod channel;
pub mod headless;
pub mod mock;
pub mod terminal;

pub use channel::{channel_ui, ChannelUi, UiHandle, UiMessage};
pub use headless::HeadlessUi;
pub use mock::ScriptedUi;
pub use terminal::TerminalUi;

use serde::Serialize;
use serde_yaml::Value;

use crate::engine::PrepareResult;
use crate::state::UserConfigOverrides;

/// One provider option as the user should see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionState {
    /// Option key.
    pub name: String,
    /// Human label.
    pub label: String,
    /// Currently resolved value.
    pub value: Option<Value>,
    /// Provider default.
    pub default: Option<Value>,
    /// Allowed values; empty means free-form.
    pub choices: Vec<String>,
    /// Whether no layer supplies a value. Only some providers need every
    /// option, so this does not by itself block provisioning.
    pub missing: bool,
}

/// One unsatisfied requirement awaiting a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingItem {
    /// Requirement key (its variable).
    pub requirement: String,
    pub title: String,
    /// Provider class responsible for it.
    pub provider: String,
    /// Why it is unsatisfied.
    pub status_description: String,
    pub options: Vec<OptionState>,
}

/// Everything still unsatisfied after a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingSchema {
    /// Loop pass the schema was built on, starting at 1.
    pub pass: usize,
    pub items: Vec<OutstandingItem>,
}

impl OutstandingSchema {
    /// Item for a requirement.
    pub fn find(&self, requirement: &str) -> Option<&OutstandingItem> {
        self.items.iter().find(|i| i.requirement == requirement)
    }

    /// Overrides that accept every currently resolved value.
    pub fn current_choices(&self) -> UserConfigOverrides {
        let mut overrides = UserConfigOverrides::new();
        for item in &self.items {
            for option in &item.options {
                if let Some(value) = &option.value {
                    overrides.set(&item.requirement, &option.name, value.clone());
                }
            }
        }
        overrides
    }
}

/// What the user did with an outstanding schema.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Try again with these option values.
    OverridesSubmitted(UserConfigOverrides),
    /// Give up.
    Stopped,
}

/// A transport for negotiating outstanding options.
pub trait UiChannel {
    /// Whether [`UiChannel::present`] can ever return overrides.
    fn is_interactive(&self) -> bool;

    /// Show what is outstanding and block until the user answers.
    fn present(&mut self, schema: &OutstandingSchema) -> UiEvent;

    /// Called once with the final result.
    fn finished(&mut self, _result: &PrepareResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> OutstandingSchema {
        OutstandingSchema {
            pass: 1,
            items: vec![OutstandingItem {
                requirement: "FOO".into(),
                title: "FOO".into(),
                provider: "EnvVarProvider".into(),
                status_description: "Environment variable FOO is not set.".into(),
                options: vec![
                    OptionState {
                        name: "source".into(),
                        label: "Source".into(),
                        value: Some(Value::from("variables")),
                        default: Some(Value::from("variables")),
                        choices: vec!["environ".into(), "variables".into()],
                        missing: false,
                    },
                    OptionState {
                        name: "value".into(),
                        label: "Value".into(),
                        value: None,
                        default: None,
                        choices: vec![],
                        missing: true,
                    },
                ],
            }],
        }
    }

    #[test]
    fn find_locates_items() {
        let schema = schema();
        assert!(schema.find("FOO").is_some());
        assert!(schema.find("BAR").is_none());
    }

    #[test]
    fn current_choices_skip_missing_values() {
        let overrides = schema().current_choices();
        assert_eq!(overrides.get("FOO", "source"), Some(&Value::from("variables")));
        assert!(overrides.get("FOO", "value").is_none());
    }

    #[test]
    fn schema_serializes_to_json() {
        let json = serde_json::to_value(schema()).unwrap();
        assert_eq!(json["pass"], 1);
        assert_eq!(json["items"][0]["requirement"], "FOO");
        assert_eq!(json["items"][0]["options"][1]["missing"], true);
    }
}
