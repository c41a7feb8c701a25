//! Scripted UI for testing.
//!
//! `ScriptedUi` answers each outstanding schema with the next queued
//! event and records everything it was shown.
//!
//! # Example
//!
//! ```
//! use rigup::state::UserConfigOverrides;
//! use rigup::ui::{OutstandingSchema, ScriptedUi, UiChannel, UiEvent};
//!
//! let mut ui = ScriptedUi::new()
//!     .then_submit(UserConfigOverrides::new().with("FOO", "value", "bar"));
//!
//! let schema = OutstandingSchema { pass: 1, items: vec![] };
//! assert!(matches!(ui.present(&schema), UiEvent::OverridesSubmitted(_)));
//! // Script exhausted.
//! assert_eq!(ui.present(&schema), UiEvent::Stopped);
//! assert_eq!(ui.presented().len(), 2);
//! ```

use std::collections::VecDeque;

use super::{OutstandingSchema, UiChannel, UiEvent};
use crate::engine::PrepareResult;
use crate::state::UserConfigOverrides;

#[derive(Debug, Default)]
pub struct ScriptedUi {
    script: VecDeque<UiEvent>,
    presented: Vec<OutstandingSchema>,
    result: Option<PrepareResult>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a submission.
    pub fn then_submit(mut self, overrides: UserConfigOverrides) -> Self {
        self.script.push_back(UiEvent::OverridesSubmitted(overrides));
        self
    }

    /// Queue a submission that accepts whatever is shown.
    pub fn then_accept(self) -> Self {
        self.then_submit(UserConfigOverrides::new())
    }

    /// Queue a stop.
    pub fn then_stop(mut self) -> Self {
        self.script.push_back(UiEvent::Stopped);
        self
    }

    /// Every schema shown so far.
    pub fn presented(&self) -> &[OutstandingSchema] {
        &self.presented
    }

    /// The final result, once the loop has ended.
    pub fn result(&self) -> Option<&PrepareResult> {
        self.result.as_ref()
    }
}

impl UiChannel for ScriptedUi {
    fn is_interactive(&self) -> bool {
        true
    }

    fn present(&mut self, schema: &OutstandingSchema) -> UiEvent {
        self.presented.push(schema.clone());
        self.script.pop_front().unwrap_or(UiEvent::Stopped)
    }

    fn finished(&mut self, result: &PrepareResult) {
        self.result = Some(result.clone());
    }
}
