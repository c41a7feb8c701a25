//! rigup - Prepare a project's runtime environment before its commands run.
//!
//! A project declares requirements in `rigup.yml`: variables that must be
//! set, files that must be downloaded, a conda environment that must exist.
//! rigup checks each one and drives a provider to satisfy whatever is
//! missing, either headless or by asking a user for the options it cannot
//! work out. The outcome is an environment mapping to launch commands with.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`engine`] - The check, provision, negotiate loop
//! - [`error`] - Error types and result aliases
//! - [`project`] - Project directory and `rigup.yml` loading
//! - [`providers`] - Providers that satisfy requirements
//! - [`requirements`] - Requirement types, status, and the plugin registry
//! - [`state`] - Persisted and per-run provider configuration
//! - [`tools`] - External tools (conda, HTTP downloads) behind traits
//! - [`ui`] - Negotiation channels
//!
//! # Example
//!
//! ```
//! use rigup::engine::{prepare, PrepareOptions};
//! use rigup::project::Project;
//! use rigup::requirements::{Environ, PluginRegistry};
//! use rigup::tools::fake::fake_tools;
//! use rigup::ui::HeadlessUi;
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("rigup.yml"), "runtime:\n  GREETING: hello\n").unwrap();
//!
//! let registry = PluginRegistry::with_tools(fake_tools());
//! let mut project = Project::load(dir.path(), &registry).unwrap();
//! let result = prepare(
//!     &mut project,
//!     &registry,
//!     &Environ::new(),
//!     &mut HeadlessUi::new(),
//!     &PrepareOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(result.environ().unwrap()["GREETING"], "hello");
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod project;
pub mod providers;
pub mod requirements;
pub mod state;
pub mod tools;
pub mod ui;

pub use error::{Result, RigupError};
