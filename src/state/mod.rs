//! Configuration layers that persist or accumulate provider choices.
//!
//! - [`local_state`] - durable per-project store of chosen provider options
//! - [`overrides`] - transient per-invocation option overrides

pub mod local_state;
pub mod overrides;

pub use local_state::LocalStateFile;
pub use overrides::UserConfigOverrides;
