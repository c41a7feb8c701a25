//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rigup - Prepare a project's runtime environment.
#[derive(Debug, Parser)]
#[command(name = "rigup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to project directory (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Set up every requirement of the project (default)
    Prepare(PrepareArgs),

    /// Prepare, then print shell exports for the prepared environment
    Activate(PrepareArgs),

    /// Show whether each requirement currently holds
    Check(CheckArgs),
}

/// Arguments for `prepare` and `activate`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PrepareArgs {
    /// Ask at the terminal for options that can't be worked out
    #[arg(short, long)]
    pub interactive: bool,

    /// Keep asking after a failed attempt instead of giving up
    #[arg(long, requires = "interactive")]
    pub keep_going: bool,
}

/// Arguments for `check`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
