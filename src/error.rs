//! Error types for rigup operations.
//!
//! This module defines [`RigupError`], the error type for infrastructure
//! failures (unreadable project files, corrupt local state, I/O), and a
//! [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Malformed project configuration is *data*: it is collected as problem
//!   strings on the [`Project`](crate::project::Project), never raised.
//! - Unmet requirements are [`RequirementStatus`](crate::requirements::RequirementStatus)
//!   values that drive the prepare loop.
//! - Provisioning failures are [`ProvisionError`](crate::providers::ProvisionError)
//!   values caught at the provisioning call site.
//! - Everything else (I/O, corrupt YAML on disk) is a `RigupError`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rigup operations.
#[derive(Debug, Error)]
pub enum RigupError {
    /// Project directory does not exist.
    #[error("Project directory not found: {path}")]
    ProjectNotFound { path: PathBuf },

    /// Failed to parse the project file.
    #[error("Failed to parse project file at {path}: {message}")]
    ProjectParseError { path: PathBuf, message: String },

    /// Failed to parse the local state file.
    #[error("Failed to parse local state at {path}: {message}")]
    StateParseError { path: PathBuf, message: String },

    /// Failed to serialize the local state file.
    #[error("Failed to write local state at {path}: {message}")]
    StateWriteError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for rigup operations.
pub type Result<T> = std::result::Result<T, RigupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_not_found_displays_path() {
        let err = RigupError::ProjectNotFound {
            path: PathBuf::from("/no/such/project"),
        };
        assert!(err.to_string().contains("/no/such/project"));
    }

    #[test]
    fn project_parse_error_displays_path_and_message() {
        let err = RigupError::ProjectParseError {
            path: PathBuf::from("/p/rigup.yml"),
            message: "did not find expected key".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/p/rigup.yml"));
        assert!(msg.contains("did not find expected key"));
    }

    #[test]
    fn state_parse_error_displays_path() {
        let err = RigupError::StateParseError {
            path: PathBuf::from("/p/.rigup/local_state.yml"),
            message: "bad indentation".into(),
        };
        assert!(err.to_string().contains("local_state.yml"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: RigupError = io_err.into();
        assert!(matches!(err, RigupError::Io(_)));
    }

    #[test]
    fn anyhow_error_converts() {
        let err: RigupError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
