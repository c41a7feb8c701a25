//! Check command implementation.
//!
//! `rigup check` shows whether each requirement currently holds, without
//! setting anything up.

use std::path::{Path, PathBuf};

use crate::cli::args::CheckArgs;
use crate::cli::output::Output;
use crate::engine::check_statuses;
use crate::error::{Result, RigupError};

use super::dispatcher::{process_environ, Command, CommandResult};
use super::prepare::open_project;

/// The check command implementation.
pub struct CheckCommand {
    project_root: PathBuf,
    args: CheckArgs,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(project_root: &Path, args: CheckArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            args,
        }
    }
}

impl Command for CheckCommand {
    fn execute(&self, out: &mut Output) -> Result<CommandResult> {
        let Some((_registry, project)) = open_project(&self.project_root, out)? else {
            return Ok(CommandResult::failure(2));
        };

        let reports = check_statuses(&project, &process_environ());
        let all_ok =
            project.problems().is_empty() && reports.iter().all(|r| r.status.is_satisfied());

        if self.args.json {
            let json = serde_json::json!({
                "problems": project.problems(),
                "requirements": reports,
            });
            let text = serde_json::to_string_pretty(&json)
                .map_err(|e| RigupError::Other(e.into()))?;
            out.payload(&text);
        } else {
            for problem in project.problems() {
                out.error(problem);
            }
            if reports.is_empty() {
                out.message("No requirements.");
            }
            for report in &reports {
                out.status(
                    report.status.is_satisfied(),
                    &report.requirement,
                    report.status.description(),
                );
            }
        }

        Ok(if all_ok {
            CommandResult::success()
        } else {
            CommandResult::failure(1)
        })
    }
}
