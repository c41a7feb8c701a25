//! Negotiation over `mpsc` with a transport running on another thread.
//!
//! The prepare loop owns a [`ChannelUi`]; the transport (an HTTP endpoint,
//! a test driver) owns the matching [`UiHandle`]. The loop blocks only its
//! own thread while waiting. Dropping the handle, or letting the idle
//! timeout lapse, stops the loop.
//!
//! ```
//! use rigup::ui::{channel_ui, UiChannel, UiEvent, UiMessage, OutstandingSchema};
//! use std::thread;
//!
//! let (mut ui, handle) = channel_ui(None);
//! let transport = thread::spawn(move || {
//!     if let Some(UiMessage::Outstanding(_)) = handle.recv() {
//!         handle.stop();
//!     }
//! });
//!
//! let event = ui.present(&OutstandingSchema { pass: 1, items: vec![] });
//! assert_eq!(event, UiEvent::Stopped);
//! transport.join().unwrap();
//! ```

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use super::{OutstandingSchema, UiChannel, UiEvent};
use crate::engine::PrepareResult;
use crate::state::UserConfigOverrides;

/// Messages from the prepare loop to the transport.
#[derive(Debug, Clone)]
pub enum UiMessage {
    /// The loop is waiting on these requirements.
    Outstanding(OutstandingSchema),
    /// The loop has ended.
    Finished(PrepareResult),
}

/// Loop side of the channel.
pub struct ChannelUi {
    to_ui: Sender<UiMessage>,
    from_ui: Receiver<UiEvent>,
    idle_timeout: Option<Duration>,
}

/// Transport side of the channel.
pub struct UiHandle {
    from_engine: Receiver<UiMessage>,
    to_engine: Sender<UiEvent>,
}

/// Create a connected pair.
///
/// With an `idle_timeout`, a loop left waiting that long without an answer
/// stops.
pub fn channel_ui(idle_timeout: Option<Duration>) -> (ChannelUi, UiHandle) {
    let (to_ui, from_engine) = mpsc::channel();
    let (to_engine, from_ui) = mpsc::channel();
    (
        ChannelUi {
            to_ui,
            from_ui,
            idle_timeout,
        },
        UiHandle {
            from_engine,
            to_engine,
        },
    )
}

impl UiChannel for ChannelUi {
    fn is_interactive(&self) -> bool {
        true
    }

    fn present(&mut self, schema: &OutstandingSchema) -> UiEvent {
        if self.to_ui.send(UiMessage::Outstanding(schema.clone())).is_err() {
            tracing::debug!("UI transport is gone");
            return UiEvent::Stopped;
        }

        let received = match self.idle_timeout {
            Some(timeout) => self.from_ui.recv_timeout(timeout),
            None => self
                .from_ui
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => {
                tracing::info!("No answer from the UI; stopping");
                UiEvent::Stopped
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("UI transport disconnected");
                UiEvent::Stopped
            }
        }
    }

    fn finished(&mut self, result: &PrepareResult) {
        let _ = self.to_ui.send(UiMessage::Finished(result.clone()));
    }
}

impl UiHandle {
    /// Wait for the next message; `None` once the loop has gone away.
    pub fn recv(&self) -> Option<UiMessage> {
        self.from_engine.recv().ok()
    }

    /// Wait at most `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<UiMessage> {
        self.from_engine.recv_timeout(timeout).ok()
    }

    /// Answer with option values. Returns false if the loop is gone.
    pub fn submit(&self, overrides: UserConfigOverrides) -> bool {
        self.to_engine
            .send(UiEvent::OverridesSubmitted(overrides))
            .is_ok()
    }

    /// Ask the loop to stop. Returns false if the loop is gone.
    pub fn stop(&self) -> bool {
        self.to_engine.send(UiEvent::Stopped).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn empty_schema() -> OutstandingSchema {
        OutstandingSchema {
            pass: 1,
            items: vec![],
        }
    }

    #[test]
    fn submitted_overrides_reach_the_loop() {
        let (mut ui, handle) = channel_ui(None);
        let transport = thread::spawn(move || {
            let message = handle.recv();
            assert!(matches!(message, Some(UiMessage::Outstanding(_))));
            handle.submit(UserConfigOverrides::new().with("FOO", "value", "bar"));
        });

        let event = ui.present(&empty_schema());
        transport.join().unwrap();

        match event {
            UiEvent::OverridesSubmitted(overrides) => {
                assert_eq!(overrides.get("FOO", "value"), Some(&"bar".into()))
            }
            UiEvent::Stopped => panic!("expected overrides"),
        }
    }

    #[test]
    fn dropped_handle_is_a_stop() {
        let (mut ui, handle) = channel_ui(None);
        drop(handle);
        assert_eq!(ui.present(&empty_schema()), UiEvent::Stopped);
    }

    #[test]
    fn idle_timeout_is_a_stop() {
        let (mut ui, _handle) = channel_ui(Some(Duration::from_millis(20)));
        assert_eq!(ui.present(&empty_schema()), UiEvent::Stopped);
    }
}
