//! Outcome and options of a prepare run.

use serde::Serialize;

use crate::providers::ProvideMode;
use crate::requirements::Environ;

/// Upper bound on check passes in one run.
pub const DEFAULT_MAX_PASSES: usize = 16;

/// The error reported when the user stops negotiation.
pub const STOPPED_MESSAGE: &str = "Browser UI main loop was stopped.";

/// The only thing a prepare run hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PrepareResult {
    /// Every requirement holds; `environ` is ready to launch commands with.
    Success { environ: Environ },
    /// At least one requirement does not hold.
    Failure {
        errors: Vec<String>,
        /// The user ended the run rather than it running out of options.
        stopped: bool,
    },
}

impl PrepareResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PrepareResult::Success { .. })
    }

    /// The prepared environment, on success.
    pub fn environ(&self) -> Option<&Environ> {
        match self {
            PrepareResult::Success { environ } => Some(environ),
            PrepareResult::Failure { .. } => None,
        }
    }

    /// Why the run failed; empty on success.
    pub fn errors(&self) -> &[String] {
        match self {
            PrepareResult::Success { .. } => &[],
            PrepareResult::Failure { errors, .. } => errors,
        }
    }

    pub fn was_stopped(&self) -> bool {
        matches!(self, PrepareResult::Failure { stopped: true, .. })
    }

    pub(crate) fn failed(errors: Vec<String>) -> Self {
        PrepareResult::Failure {
            errors,
            stopped: false,
        }
    }

    pub(crate) fn stopped() -> Self {
        PrepareResult::Failure {
            errors: vec![STOPPED_MESSAGE.to_string()],
            stopped: true,
        }
    }
}

/// Knobs for a prepare run.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub mode: ProvideMode,
    /// Keep negotiating after failures instead of giving up, as long as an
    /// interactive channel is attached.
    pub keep_going_until_success: bool,
    pub max_passes: usize,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            mode: ProvideMode::Default,
            keep_going_until_success: false,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl PrepareOptions {
    /// Options for a status-only run.
    pub fn check() -> Self {
        Self {
            mode: ProvideMode::Check,
            ..Self::default()
        }
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going_until_success = keep_going;
        self
    }
}
