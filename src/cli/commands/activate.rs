//! Activate command implementation.
//!
//! `rigup activate` prepares the project and prints `export` lines, so a
//! shell can adopt the prepared environment with `eval "$(rigup activate)"`.

use std::path::{Path, PathBuf};

use crate::cli::args::PrepareArgs;
use crate::cli::output::Output;
use crate::engine::activate;
use crate::error::Result;

use super::dispatcher::{process_environ, Command, CommandResult};
use super::prepare::{open_project, options_for, report_failure, ui_for};

/// The activate command implementation.
pub struct ActivateCommand {
    project_root: PathBuf,
    args: PrepareArgs,
}

impl ActivateCommand {
    /// Create a new activate command.
    pub fn new(project_root: &Path, args: PrepareArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            args,
        }
    }
}

impl Command for ActivateCommand {
    fn execute(&self, out: &mut Output) -> Result<CommandResult> {
        let Some((registry, mut project)) = open_project(&self.project_root, out)? else {
            return Ok(CommandResult::failure(2));
        };

        let mut ui = ui_for(&self.args);
        let activation = activate(
            &mut project,
            &registry,
            &process_environ(),
            ui.as_mut(),
            &options_for(&self.args),
        )?;

        if report_failure(&activation.result, out) {
            return Ok(CommandResult::failure(1));
        }
        for line in &activation.exports {
            out.payload(line);
        }
        Ok(CommandResult::success())
    }
}
