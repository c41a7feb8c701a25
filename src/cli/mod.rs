//! Command-line interface for rigup.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations
//! - [`output`] - Styled terminal output

pub mod args;
pub mod commands;
pub mod output;

pub use args::{CheckArgs, Cli, Commands, PrepareArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
pub use output::Output;
