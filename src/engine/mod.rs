//! Reconciliation of a project's requirements with the world.
//!
//! - [`prepare()`] - the check, provision, negotiate loop
//! - [`activate()`] - prepare, then render shell exports
//! - [`check_statuses`] - status only
//!
//! # Example
//!
//! ```no_run
//! use rigup::engine::{prepare, PrepareOptions};
//! use rigup::project::Project;
//! use rigup::requirements::{Environ, PluginRegistry};
//! use rigup::ui::HeadlessUi;
//! use std::path::Path;
//!
//! let registry = PluginRegistry::new();
//! let mut project = Project::load(Path::new("."), &registry)?;
//! let environ: Environ = std::env::vars().collect();
//! let result = prepare(
//!     &mut project,
//!     &registry,
//!     &environ,
//!     &mut HeadlessUi::new(),
//!     &PrepareOptions::default(),
//! )?;
//! for error in result.errors() {
//!     eprintln!("{}", error);
//! }
//! # Ok::<(), rigup::error::RigupError>(())
//! ```

pub mod activate;
pub mod prepare;
pub mod result;

pub use activate::{activate, export_lines, Activation};
pub use prepare::{check_statuses, prepare, LoopState};
pub use result::{PrepareOptions, PrepareResult, DEFAULT_MAX_PASSES, STOPPED_MESSAGE};
