//! Conda environment specs declared by a project.
//!
//! ```yaml
//! dependencies:
//!   - python
//! channels:
//!   - conda-forge
//! environments:
//!   py2:
//!     dependencies: [python=2.7]
//!   py3: {}
//! ```
//!
//! Global `dependencies` and `channels` apply to every named environment.
//! When no environment is named, a single `default` environment carries the
//! global lists.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::requirements::repr;

/// Name of the environment created when the project names none.
pub const DEFAULT_ENV_NAME: &str = "default";

/// Sections that imply the project wants a conda environment.
pub const CONDA_SECTIONS: [&str; 3] = ["dependencies", "channels", "environments"];

/// One named conda environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvSpec {
    /// Directory name under `<project>/envs/`.
    pub name: String,
    /// Package specs, e.g. `numpy` or `python=3.11`.
    pub dependencies: Vec<String>,
    /// Channels to install from, in priority order.
    pub channels: Vec<String>,
}

impl EnvSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            channels: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }
}

/// Whether the project file declares anything conda-related.
pub fn has_conda_sections(root: &Mapping) -> bool {
    CONDA_SECTIONS.iter().any(|s| root.contains_key(*s))
}

/// Parse the environment specs of a project file, in declaration order.
///
/// Never fails; malformed sections add to `problems` and are skipped.
pub fn parse_env_specs(root: &Mapping, problems: &mut Vec<String>) -> Vec<EnvSpec> {
    let dependencies = string_list(root.get("dependencies"), "dependencies", problems);
    let channels = string_list(root.get("channels"), "channels", problems);

    let mut specs = Vec::new();

    match root.get("environments") {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(envs)) => {
            for (name, body) in envs {
                let Some(name) = name.as_str() else {
                    problems.push(format!(
                        "environments: name {} should be a string.",
                        repr(name)
                    ));
                    continue;
                };
                let body = match body {
                    Value::Null => Mapping::new(),
                    Value::Mapping(m) => m.clone(),
                    other => {
                        problems.push(format!(
                            "environments: {} should be a dictionary, not {}.",
                            name,
                            repr(other)
                        ));
                        continue;
                    }
                };

                let own_deps = string_list(
                    body.get("dependencies"),
                    &format!("environments: {}: dependencies", name),
                    problems,
                );
                let own_channels = string_list(
                    body.get("channels"),
                    &format!("environments: {}: channels", name),
                    problems,
                );

                specs.push(EnvSpec {
                    name: name.to_string(),
                    dependencies: concat_unique(&dependencies, &own_deps),
                    channels: concat_unique(&channels, &own_channels),
                });
            }
        }
        Some(other) => problems.push(format!(
            "environments: should be a dictionary from environment name to environment attributes, not {}.",
            repr(other)
        )),
    }

    if specs.is_empty() {
        specs.push(EnvSpec {
            name: DEFAULT_ENV_NAME.to_string(),
            dependencies,
            channels,
        });
    }

    specs
}

fn string_list(value: Option<&Value>, what: &str, problems: &mut Vec<String>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => {
            let mut out = Vec::new();
            for item in items {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => problems.push(format!(
                        "{}: value should be a list of strings, not {}.",
                        what,
                        repr(item)
                    )),
                }
            }
            out
        }
        Some(other) => {
            problems.push(format!(
                "{}: value should be a list of strings, not {}.",
                what,
                repr(other)
            ));
            Vec::new()
        }
    }
}

fn concat_unique(first: &[String], second: &[String]) -> Vec<String> {
    let mut out = first.to_vec();
    for item in second {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
