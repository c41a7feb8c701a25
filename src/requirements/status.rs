//! Requirement status types.
//!
//! Each status check produces a fresh `RequirementStatus` describing whether
//! the requirement currently holds, with a human-readable explanation.

use serde::Serialize;

/// The result of checking a single requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequirementStatus {
    /// The requirement holds.
    Satisfied {
        /// What was found (e.g. "File downloaded to /p/data.csv").
        description: String,
    },

    /// The requirement does not hold.
    Unsatisfied {
        /// What is wrong (e.g. "Environment variable DATAFILE is not set.").
        description: String,
    },
}

impl RequirementStatus {
    /// Build a satisfied status.
    pub fn satisfied(description: impl Into<String>) -> Self {
        RequirementStatus::Satisfied {
            description: description.into(),
        }
    }

    /// Build an unsatisfied status.
    pub fn unsatisfied(description: impl Into<String>) -> Self {
        RequirementStatus::Unsatisfied {
            description: description.into(),
        }
    }

    /// Whether the requirement holds.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, RequirementStatus::Satisfied { .. })
    }

    /// The human-readable explanation.
    pub fn description(&self) -> &str {
        match self {
            RequirementStatus::Satisfied { description }
            | RequirementStatus::Unsatisfied { description } => description,
        }
    }
}

/// The result of checking one requirement of a project.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// The requirement key (its environment variable).
    pub requirement: String,
    /// Provider class name responsible for the requirement.
    pub provider: String,
    /// The status of the requirement.
    pub status: RequirementStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfied_is_satisfied() {
        let status = RequirementStatus::satisfied("File downloaded to /tmp/x");
        assert!(status.is_satisfied());
        assert_eq!(status.description(), "File downloaded to /tmp/x");
    }

    #[test]
    fn unsatisfied_is_not_satisfied() {
        let status = RequirementStatus::unsatisfied("Environment variable FOO is not set.");
        assert!(!status.is_satisfied());
        assert_eq!(status.description(), "Environment variable FOO is not set.");
    }

    #[test]
    fn serializes_with_tag() {
        let status = RequirementStatus::unsatisfied("nope");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "unsatisfied");
        assert_eq!(json["description"], "nope");
    }

    #[test]
    fn status_report_holds_requirement_and_status() {
        let report = StatusReport {
            requirement: "DATAFILE".to_string(),
            provider: "DownloadProvider".to_string(),
            status: RequirementStatus::satisfied("ok"),
        };
        assert_eq!(report.requirement, "DATAFILE");
        assert!(report.status.is_satisfied());
    }
}
