//! Requirements: declarative preconditions a project places on its environment.
//!
//! Each requirement governs one environment variable, knows how to check
//! whether it currently holds, and names the provider that can satisfy it.
//!
//! # Modules
//!
//! - [`requirement`] - The [`Requirement`] trait and parser contract
//! - [`status`] - Results of status checks
//! - [`registry`] - Lookup of parsers and providers
//! - [`env_var`] - Plain runtime variables
//! - [`download`] - Files fetched over HTTP
//! - [`conda_env`] - The project's conda environment

pub mod conda_env;
pub mod download;
pub mod env_var;
pub mod registry;
pub mod requirement;
pub mod status;

pub use conda_env::{CondaEnvRequirement, CONDA_ENV_VAR};
pub use download::{DownloadRequirement, HashAlgorithm};
pub use env_var::EnvVarRequirement;
pub use registry::PluginRegistry;
pub use requirement::{repr, Environ, ParseContext, Requirement, RequirementParser, PROJECT_DIR_VAR};
pub use status::{RequirementStatus, StatusReport};
