//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, PrepareArgs};
use crate::cli::output::Output;
use crate::error::Result;
use crate::project::Project;
use crate::requirements::{Environ, PluginRegistry};

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `out`.
    fn execute(&self, out: &mut Output) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project directory.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, out: &mut Output) -> Result<CommandResult> {
        match &cli.command {
            Some(Commands::Prepare(args)) => {
                super::prepare::PrepareCommand::new(&self.project_root, args.clone()).execute(out)
            }
            Some(Commands::Activate(args)) => {
                super::activate::ActivateCommand::new(&self.project_root, args.clone()).execute(out)
            }
            Some(Commands::Check(args)) => {
                super::check::CheckCommand::new(&self.project_root, args.clone()).execute(out)
            }
            None => super::prepare::PrepareCommand::new(&self.project_root, PrepareArgs::default())
                .execute(out),
        }
    }
}

/// The calling process's environment.
pub(crate) fn process_environ() -> Environ {
    std::env::vars().collect()
}

/// Load a project with the built-in registry.
pub(crate) fn load_project(project_root: &Path) -> Result<(PluginRegistry, Project)> {
    let registry = PluginRegistry::new();
    let project = Project::load(project_root, &registry)?;
    Ok((registry, project))
}
