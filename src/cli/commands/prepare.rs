//! Prepare command implementation.
//!
//! `rigup prepare` sets up every requirement of the project.

use std::path::{Path, PathBuf};

use crate::cli::args::PrepareArgs;
use crate::cli::output::Output;
use crate::engine::{prepare, PrepareOptions, PrepareResult};
use crate::error::{Result, RigupError};
use crate::project::Project;
use crate::requirements::PluginRegistry;
use crate::ui::{HeadlessUi, TerminalUi, UiChannel};

use super::dispatcher::{load_project, process_environ, Command, CommandResult};

/// The prepare command implementation.
pub struct PrepareCommand {
    project_root: PathBuf,
    args: PrepareArgs,
}

impl PrepareCommand {
    /// Create a new prepare command.
    pub fn new(project_root: &Path, args: PrepareArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &PrepareArgs {
        &self.args
    }
}

impl Command for PrepareCommand {
    fn execute(&self, out: &mut Output) -> Result<CommandResult> {
        let Some((registry, mut project)) = open_project(&self.project_root, out)? else {
            return Ok(CommandResult::failure(2));
        };

        let mut ui = ui_for(&self.args);
        let result = prepare(
            &mut project,
            &registry,
            &process_environ(),
            ui.as_mut(),
            &options_for(&self.args),
        )?;

        if report_failure(&result, out) {
            return Ok(CommandResult::failure(1));
        }
        out.success(&format!("Project {} is ready.", project.name()));
        Ok(CommandResult::success())
    }
}

/// Load the project, turning a missing directory into a reported failure.
pub(crate) fn open_project(
    project_root: &Path,
    out: &mut Output,
) -> Result<Option<(PluginRegistry, Project)>> {
    match load_project(project_root) {
        Ok(loaded) => Ok(Some(loaded)),
        Err(RigupError::ProjectNotFound { path }) => {
            out.error(&format!("No project directory at {}", path.display()));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn ui_for(args: &PrepareArgs) -> Box<dyn UiChannel> {
    if args.interactive {
        Box::new(TerminalUi::new())
    } else {
        Box::new(HeadlessUi::new())
    }
}

pub(crate) fn options_for(args: &PrepareArgs) -> PrepareOptions {
    PrepareOptions::default().keep_going(args.keep_going)
}

/// Print the errors of a failed result. Returns whether it failed.
pub(crate) fn report_failure(result: &PrepareResult, out: &mut Output) -> bool {
    if result.is_success() {
        return false;
    }
    for error in result.errors() {
        out.error(error);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_unless_interactive() {
        assert!(!ui_for(&PrepareArgs::default()).is_interactive());
    }

    #[test]
    fn keep_going_flows_into_options() {
        let args = PrepareArgs {
            interactive: true,
            keep_going: true,
        };
        assert!(options_for(&args).keep_going_until_success);
        assert!(!options_for(&PrepareArgs::default()).keep_going_until_success);
    }
}
