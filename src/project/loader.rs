//! Loading a project directory.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, RigupError};
use crate::project::env_spec::{has_conda_sections, parse_env_specs, EnvSpec};
use crate::requirements::{repr, ParseContext, PluginRegistry, Requirement, CONDA_ENV_VAR};
use crate::state::LocalStateFile;

/// File name of the project description inside the project directory.
pub const PROJECT_FILENAME: &str = "rigup.yml";

/// A project directory with its parsed requirements.
///
/// Malformed entries in the project file never fail loading; they are
/// collected in [`Project::problems`] and the offending requirement is
/// left out.
#[derive(Debug)]
pub struct Project {
    directory: PathBuf,
    name: Option<String>,
    requirements: Vec<Arc<dyn Requirement>>,
    problems: Vec<String>,
    env_specs: Vec<EnvSpec>,
    pub(crate) local_state: LocalStateFile,
}

impl Project {
    /// Load the project in `directory` using the registry's parsers.
    ///
    /// A directory without a project file is an empty project.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the directory doesn't exist.
    /// Returns `ProjectParseError` if the project file is not valid YAML.
    /// Returns `StateParseError` if the local state file is corrupt.
    pub fn load(directory: &Path, registry: &PluginRegistry) -> Result<Self> {
        if !directory.is_dir() {
            return Err(RigupError::ProjectNotFound {
                path: directory.to_path_buf(),
            });
        }

        let local_state = LocalStateFile::load_for_directory(directory)?;
        let mut project = Self {
            directory: directory.to_path_buf(),
            name: None,
            requirements: Vec::new(),
            problems: Vec::new(),
            env_specs: Vec::new(),
            local_state,
        };
        project.reload(registry)?;
        Ok(project)
    }

    /// Re-read the project file, keeping the loaded local state.
    pub fn reload(&mut self, registry: &PluginRegistry) -> Result<()> {
        let root = read_project_file(&self.project_file())?;

        let mut problems = Vec::new();
        let name = match root.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                problems.push(format!("name: field should have a string value not {}", repr(other)));
                None
            }
        };
        let env_specs = parse_env_specs(&root, &mut problems);
        let requirements = parse_requirements(&root, registry, &env_specs, &mut problems);

        tracing::debug!(
            "Loaded {} requirement(s) and {} problem(s) from {}",
            requirements.len(),
            problems.len(),
            self.directory.display()
        );

        self.name = name;
        self.env_specs = env_specs;
        self.requirements = requirements;
        self.problems = problems;
        Ok(())
    }

    /// Root directory of the project.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the project file.
    pub fn project_file(&self) -> PathBuf {
        self.directory.join(PROJECT_FILENAME)
    }

    /// Project name, defaulting to the directory name.
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.directory
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// Requirements in declaration order.
    pub fn requirements(&self) -> &[Arc<dyn Requirement>] {
        &self.requirements
    }

    /// Requirement governing a variable.
    pub fn find_requirement(&self, env_var: &str) -> Option<&Arc<dyn Requirement>> {
        self.requirements.iter().find(|r| r.env_var() == env_var)
    }

    /// Everything wrong with the project file.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Conda environment specs, in declaration order.
    pub fn env_specs(&self) -> &[EnvSpec] {
        &self.env_specs
    }

    /// The persisted provider choices for this project.
    pub fn local_state(&self) -> &LocalStateFile {
        &self.local_state
    }
}

fn read_project_file(path: &Path) -> Result<Mapping> {
    if !path.exists() {
        tracing::debug!("No project file at {}", path.display());
        return Ok(Mapping::new());
    }

    let content = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| RigupError::ProjectParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(m) => Ok(m),
        other => Err(RigupError::ProjectParseError {
            path: path.to_path_buf(),
            message: format!("top level should be a dictionary, not {}", repr(&other)),
        }),
    }
}

fn parse_requirements(
    root: &Mapping,
    registry: &PluginRegistry,
    env_specs: &[EnvSpec],
    problems: &mut Vec<String>,
) -> Vec<Arc<dyn Requirement>> {
    let ctx = ParseContext {
        registry,
        env_specs,
    };
    let mut requirements: Vec<Arc<dyn Requirement>> = Vec::new();

    for (section, parser) in registry.sections() {
        let items: Vec<(String, Value)> = match root.get(section) {
            None | Some(Value::Null) => continue,
            Some(Value::Mapping(map)) => {
                let mut items = Vec::new();
                for (key, item) in map {
                    match key.as_str() {
                        Some(var) => items.push((var.to_string(), item.clone())),
                        None => problems.push(format!(
                            "{} section: variable name {} should be a string.",
                            section,
                            repr(key)
                        )),
                    }
                }
                items
            }
            Some(Value::Sequence(names)) => {
                let mut items = Vec::new();
                for name in names {
                    match name.as_str() {
                        Some(var) => items.push((var.to_string(), Value::Null)),
                        None => problems.push(format!(
                            "{} section: variable name {} should be a string.",
                            section,
                            repr(name)
                        )),
                    }
                }
                items
            }
            Some(other) => {
                problems.push(format!(
                    "{} section should contain a dictionary, not {}.",
                    section,
                    repr(other)
                ));
                continue;
            }
        };

        for (var, item) in items {
            let mut parsed = Vec::new();
            parser(&ctx, &var, &item, problems, &mut parsed);
            for requirement in parsed {
                push_unique(&mut requirements, requirement, problems);
            }
        }
    }

    let has_conda = requirements.iter().any(|r| r.env_var() == CONDA_ENV_VAR);
    if !has_conda && has_conda_sections(root) {
        if let Some(parser) = registry.env_var_parser(CONDA_ENV_VAR) {
            let mut parsed = Vec::new();
            parser(&ctx, CONDA_ENV_VAR, &Value::Null, problems, &mut parsed);
            requirements.extend(parsed);
        }
    }

    requirements
}

fn push_unique(
    requirements: &mut Vec<Arc<dyn Requirement>>,
    requirement: Arc<dyn Requirement>,
    problems: &mut Vec<String>,
) {
    if requirements
        .iter()
        .any(|r| r.env_var() == requirement.env_var())
    {
        problems.push(format!(
            "Variable {} is declared more than once.",
            requirement.env_var()
        ));
        return;
    }
    requirements.push(requirement);
}
