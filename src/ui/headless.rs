//! Channel for runs with nobody to ask.

use super::{OutstandingSchema, UiChannel, UiEvent};

/// Never negotiates; any attempt to ask is a stop.
#[derive(Debug, Default)]
pub struct HeadlessUi;

impl HeadlessUi {
    pub fn new() -> Self {
        Self
    }
}

impl UiChannel for HeadlessUi {
    fn is_interactive(&self) -> bool {
        false
    }

    fn present(&mut self, _schema: &OutstandingSchema) -> UiEvent {
        UiEvent::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_always_stops() {
        let mut ui = HeadlessUi::new();
        let schema = OutstandingSchema {
            pass: 1,
            items: vec![],
        };
        assert_eq!(ui.present(&schema), UiEvent::Stopped);
        assert!(!ui.is_interactive());
    }
}
