//! Project directories and their `rigup.yml` description.
//!
//! ```yaml
//! name: analysis
//! runtime:
//!   API_TOKEN: {}
//! downloads:
//!   DATAFILE: https://example.com/data.csv
//! dependencies:
//!   - pandas
//! ```

pub mod env_spec;
pub mod loader;

pub use env_spec::{EnvSpec, DEFAULT_ENV_NAME};
pub use loader::{Project, PROJECT_FILENAME};
