//! Provisioning failures raised by providers and their external tools.

use std::path::PathBuf;
use thiserror::Error;

/// A provisioning attempt failed.
///
/// The prepare loop catches these at the call site and reports the message
/// as the requirement's status; they never abort a pass.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The provider was handed a requirement type it does not understand.
    #[error("{provider} cannot provide requirement {requirement}")]
    WrongRequirement {
        provider: &'static str,
        requirement: String,
    },

    /// An external command exited unsuccessfully.
    #[error("Command failed with exit code {code:?}: {command}{}", format_stderr(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An HTTP download failed.
    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    /// The downloaded artifact does not match the declared checksum.
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// The chosen prefix is not a conda environment and must not be created.
    #[error("'{}' doesn't look like it contains a Conda environment yet.", .prefix.display())]
    NotAnEnvironment { prefix: PathBuf },

    /// The chosen named environment is not declared by the project.
    #[error("Environment {name} is not defined in the project.")]
    UnknownEnvironment { name: String },

    /// A required option has no value.
    #[error("No value provided for '{option}' of {requirement}.")]
    MissingOption { requirement: String, option: String },

    /// A file or directory could not be put in place.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = ProvisionError::CommandFailed {
            command: "conda create".into(),
            code: Some(1),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed with exit code Some(1): conda create"
        );
    }

    #[test]
    fn write_names_the_path() {
        let err = ProvisionError::Write {
            path: "/project/data/x.csv".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("Failed to write /project/data/x.csv: "));
    }

    #[test]
    fn command_failed_appends_stderr() {
        let err = ProvisionError::CommandFailed {
            command: "conda install".into(),
            code: Some(1),
            stderr: "PackageNotFoundError: boguspackage\n".into(),
        };
        assert!(err.to_string().ends_with("\nPackageNotFoundError: boguspackage"));
    }

    #[test]
    fn not_an_environment_message() {
        let err = ProvisionError::NotAnEnvironment {
            prefix: PathBuf::from("/not/a/real/environment"),
        };
        assert_eq!(
            err.to_string(),
            "'/not/a/real/environment' doesn't look like it contains a Conda environment yet."
        );
    }

    #[test]
    fn checksum_mismatch_message() {
        let err = ProvisionError::ChecksumMismatch {
            url: "http://example.com/a".into(),
            expected: "abc".into(),
            actual: "def".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected abc"));
        assert!(msg.contains("got def"));
    }
}
