//! The project's conda environment, governed by `CONDA_ENV_PATH`.
//!
//! The environment prefix is chosen through the provider options:
//!
//! - `project`: one of the project's named environments, under `<project>/envs/<name>`
//! - `environ`: whatever `CONDA_ENV_PATH` already points at
//! - `variables`: a prefix typed in by the user

use serde_yaml::Value;
use std::any::Any;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::project::{EnvSpec, DEFAULT_ENV_NAME};
use crate::providers::{
    resolve_config, CondaEnvProvider, ProvideMode, ProviderConfig, ProviderOption, ProvisionError,
};
use crate::requirements::requirement::{repr, Environ, ParseContext, Requirement, PROJECT_DIR_VAR};
use crate::requirements::status::RequirementStatus;
use crate::state::{LocalStateFile, UserConfigOverrides};
use crate::tools::conda::{installed_packages, is_conda_prefix, package_name};

/// Variable holding the active environment prefix.
pub const CONDA_ENV_VAR: &str = "CONDA_ENV_PATH";

/// Companion variable naming the active environment.
pub const CONDA_DEFAULT_ENV_VAR: &str = "CONDA_DEFAULT_ENV";

pub const SOURCE_PROJECT: &str = "project";
pub const SOURCE_ENVIRON: &str = "environ";
pub const SOURCE_VARIABLES: &str = "variables";

/// Requires a conda environment with the project's packages.
#[derive(Debug, Clone, PartialEq)]
pub struct CondaEnvRequirement {
    title: String,
    description: Option<String>,
    env_specs: Vec<EnvSpec>,
}

/// Where the environment should live, and which spec it must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct CondaTarget<'a> {
    pub source: String,
    pub prefix: PathBuf,
    pub spec: &'a EnvSpec,
}

impl CondaEnvRequirement {
    /// Build from the project's specs; an empty list means an implicit
    /// `default` environment with no packages.
    pub fn new(env_specs: Vec<EnvSpec>) -> Self {
        let env_specs = if env_specs.is_empty() {
            vec![EnvSpec::new(DEFAULT_ENV_NAME)]
        } else {
            env_specs
        };
        Self {
            title: "A Conda environment".to_string(),
            description: None,
            env_specs,
        }
    }

    pub fn env_specs(&self) -> &[EnvSpec] {
        &self.env_specs
    }

    /// The first declared environment.
    pub fn default_spec(&self) -> &EnvSpec {
        &self.env_specs[0]
    }

    pub fn find_spec(&self, name: &str) -> Option<&EnvSpec> {
        self.env_specs.iter().find(|s| s.name == name)
    }

    /// Prefix of a project-scoped environment.
    pub fn project_prefix(project_dir: &Path, name: &str) -> PathBuf {
        project_dir.join("envs").join(name)
    }

    /// The named project environment `CONDA_ENV_PATH` already points at.
    fn env_in_use(&self, environ: &Environ) -> Option<&EnvSpec> {
        let current = Path::new(environ.get(CONDA_ENV_VAR)?);
        let project_dir = Path::new(environ.get(PROJECT_DIR_VAR)?);
        self.env_specs
            .iter()
            .find(|spec| Self::project_prefix(project_dir, &spec.name) == current)
    }

    /// Options offered for the environment.
    ///
    /// `environ` is only offered when the variable points somewhere other
    /// than a project environment.
    pub fn options(&self, environ: &Environ) -> Vec<ProviderOption> {
        let in_use = self.env_in_use(environ);
        let externally_set = environ.get(CONDA_ENV_VAR).is_some_and(|v| !v.is_empty());

        let mut sources = vec![SOURCE_PROJECT];
        if externally_set && in_use.is_none() {
            sources.push(SOURCE_ENVIRON);
        }
        sources.push(SOURCE_VARIABLES);

        let names: Vec<&str> = self.env_specs.iter().map(|s| s.name.as_str()).collect();
        let env_name = in_use.unwrap_or(self.default_spec()).name.as_str();

        vec![
            ProviderOption::new("source", "Which environment to use")
                .with_default(SOURCE_PROJECT)
                .with_choices(&sources),
            ProviderOption::new("env_name", "Project environment")
                .with_default(env_name)
                .with_choices(&names),
            ProviderOption::new("value", "Environment prefix"),
        ]
    }

    /// Resolve the options through the override layers.
    pub fn read_config(
        &self,
        environ: &Environ,
        local_state: &LocalStateFile,
        overrides: &UserConfigOverrides,
    ) -> ProviderConfig {
        resolve_config(
            CONDA_ENV_VAR,
            CondaEnvProvider::CLASS_NAME,
            &self.options(environ),
            local_state,
            overrides,
        )
    }

    /// Work out which prefix a configuration designates.
    ///
    /// `Ok(None)` means the configuration names no prefix yet.
    pub fn target(
        &self,
        config: &ProviderConfig,
        environ: &Environ,
    ) -> Result<Option<CondaTarget<'_>>, ProvisionError> {
        let source = config
            .get_str("source")
            .unwrap_or_else(|| SOURCE_PROJECT.to_string());

        let spec = match config.get_str("env_name") {
            Some(name) => self
                .find_spec(&name)
                .ok_or(ProvisionError::UnknownEnvironment { name })?,
            None => self.default_spec(),
        };

        let prefix = match source.as_str() {
            SOURCE_ENVIRON => environ
                .get(CONDA_ENV_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            SOURCE_VARIABLES => config.get_str("value").filter(|v| !v.is_empty()).map(PathBuf::from),
            _ => environ
                .get(PROJECT_DIR_VAR)
                .map(|dir| Self::project_prefix(Path::new(dir), &spec.name)),
        };

        Ok(prefix.map(|prefix| CondaTarget {
            source,
            prefix,
            spec,
        }))
    }

    /// Packages of a spec that are not installed in a prefix, in spec order.
    pub fn missing_packages(spec: &EnvSpec, prefix: &Path) -> Vec<String> {
        let installed = installed_packages(prefix);
        spec.dependencies
            .iter()
            .map(|dep| package_name(dep))
            .filter(|name| !installed.contains(name))
            .collect()
    }
}

impl Requirement for CondaEnvRequirement {
    fn env_var(&self) -> &str {
        CONDA_ENV_VAR
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn provider_class_name(&self) -> &'static str {
        CondaEnvProvider::CLASS_NAME
    }

    fn check_status(
        &self,
        environ: &Environ,
        local_state: &LocalStateFile,
        _mode: ProvideMode,
        overrides: &UserConfigOverrides,
    ) -> RequirementStatus {
        let config = self.read_config(environ, local_state, overrides);
        let target = match self.target(&config, environ) {
            Ok(Some(target)) => target,
            Ok(None) => {
                return RequirementStatus::unsatisfied(format!(
                    "Environment variable {} is not set.",
                    CONDA_ENV_VAR
                ))
            }
            Err(e) => return RequirementStatus::unsatisfied(e.to_string()),
        };

        if !is_conda_prefix(&target.prefix) {
            return RequirementStatus::unsatisfied(
                ProvisionError::NotAnEnvironment {
                    prefix: target.prefix,
                }
                .to_string(),
            );
        }

        let missing = Self::missing_packages(target.spec, &target.prefix);
        if !missing.is_empty() {
            return RequirementStatus::unsatisfied(format!(
                "Conda environment is missing packages: {}",
                missing.join(", ")
            ));
        }

        match environ.get(CONDA_ENV_VAR).filter(|v| !v.is_empty()) {
            None => RequirementStatus::unsatisfied(format!(
                "Environment variable {} is not set.",
                CONDA_ENV_VAR
            )),
            Some(current) if Path::new(current) != target.prefix => {
                RequirementStatus::unsatisfied(format!(
                    "Environment variable {} is set to {}, not {}.",
                    CONDA_ENV_VAR,
                    current,
                    target.prefix.display()
                ))
            }
            Some(_) => RequirementStatus::satisfied(format!(
                "Using Conda environment {}.",
                target.prefix.display()
            )),
        }
    }

    fn contribute(&self, environ: &mut Environ) {
        let Some(prefix) = environ.get(CONDA_ENV_VAR).cloned() else {
            return;
        };
        environ.insert(CONDA_DEFAULT_ENV_VAR.to_string(), prefix.clone());

        let bin = Path::new(&prefix).join("bin");
        let mut paths: Vec<PathBuf> = environ
            .get("PATH")
            .map(|p| env::split_paths(p).collect())
            .unwrap_or_default();
        if paths.first() == Some(&bin) {
            return;
        }
        paths.insert(0, bin);
        if let Ok(joined) = env::join_paths(paths) {
            environ.insert("PATH".to_string(), joined.to_string_lossy().into_owned());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parse the `CONDA_ENV_PATH` entry of the `runtime:` section.
///
/// A `default` given in the project file is ignored; the prefix always
/// comes from the provider options.
pub fn parse(
    ctx: &ParseContext<'_>,
    varname: &str,
    item: &Value,
    problems: &mut Vec<String>,
    requirements: &mut Vec<Arc<dyn Requirement>>,
) {
    let mut requirement = CondaEnvRequirement::new(ctx.env_specs.to_vec());

    match item {
        Value::Null => {}
        Value::Mapping(map) => match map.get("description") {
            None => {}
            Some(Value::String(s)) => requirement.description = Some(s.clone()),
            Some(_) => {
                problems.push(format!(
                    "'description' field for runtime variable {} is not a string",
                    varname
                ));
                return;
            }
        },
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            tracing::debug!("Ignoring default value for {}", varname);
        }
        other => {
            problems.push(format!(
                "Runtime variable {} should be followed by a dictionary or nothing, not {}.",
                varname,
                repr(other)
            ));
            return;
        }
    }

    requirements.push(Arc::new(requirement));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_env(prefix: &Path, packages: &[&str]) {
        let meta = prefix.join("conda-meta");
        fs::create_dir_all(&meta).unwrap();
        for p in packages {
            fs::write(meta.join(format!("{}-0.1-0.json", p)), "{}").unwrap();
        }
    }

    fn setup() -> (TempDir, Environ, LocalStateFile) {
        let temp = TempDir::new().unwrap();
        let mut environ = Environ::new();
        environ.insert(
            PROJECT_DIR_VAR.to_string(),
            temp.path().to_string_lossy().into_owned(),
        );
        let state = LocalStateFile::load_for_directory(temp.path()).unwrap();
        (temp, environ, state)
    }

    fn status(req: &CondaEnvRequirement, environ: &Environ, state: &LocalStateFile) -> RequirementStatus {
        req.check_status(environ, state, ProvideMode::Default, &UserConfigOverrides::new())
    }

    #[test]
    fn missing_prefix_is_reported_first() {
        let (temp, environ, state) = setup();
        let req = CondaEnvRequirement::new(vec![]);
        let expected = format!(
            "'{}' doesn't look like it contains a Conda environment yet.",
            temp.path().join("envs/default").display()
        );
        assert_eq!(status(&req, &environ, &state).description(), expected);
    }

    #[test]
    fn missing_packages_are_listed() {
        let (temp, environ, state) = setup();
        make_env(&temp.path().join("envs/default"), &["numpy"]);
        let req = CondaEnvRequirement::new(vec![
            EnvSpec::new("default").with_dependencies(&["numpy", "ipython>=5", "scipy"]),
        ]);
        assert_eq!(
            status(&req, &environ, &state).description(),
            "Conda environment is missing packages: ipython, scipy"
        );
    }

    #[test]
    fn variable_must_point_at_the_prefix() {
        let (temp, mut environ, state) = setup();
        let prefix = temp.path().join("envs/default");
        make_env(&prefix, &[]);
        let req = CondaEnvRequirement::new(vec![]);

        assert_eq!(
            status(&req, &environ, &state).description(),
            "Environment variable CONDA_ENV_PATH is not set."
        );

        environ.insert(CONDA_ENV_VAR.into(), prefix.to_string_lossy().into_owned());
        let st = status(&req, &environ, &state);
        assert!(st.is_satisfied());
        assert_eq!(
            st.description(),
            format!("Using Conda environment {}.", prefix.display())
        );
    }

    #[test]
    fn environ_choice_is_offered_only_for_foreign_prefixes() {
        let (temp, mut environ, _) = setup();
        let req = CondaEnvRequirement::new(vec![]);
        let sources = |environ: &Environ| req.options(environ)[0].choices.clone();

        assert_eq!(sources(&environ), vec!["project", "variables"]);

        environ.insert(CONDA_ENV_VAR.into(), "/not/a/real/environment".into());
        assert_eq!(sources(&environ), vec!["project", "environ", "variables"]);

        let default_prefix = temp.path().join("envs/default");
        environ.insert(CONDA_ENV_VAR.into(), default_prefix.to_string_lossy().into_owned());
        assert_eq!(sources(&environ), vec!["project", "variables"]);
    }

    #[test]
    fn env_name_defaults_to_the_env_in_use() {
        let (temp, mut environ, _) = setup();
        let req = CondaEnvRequirement::new(vec![EnvSpec::new("first"), EnvSpec::new("second")]);
        assert_eq!(req.options(&environ)[1].default, Some(Value::from("first")));

        let second = temp.path().join("envs/second");
        environ.insert(CONDA_ENV_VAR.into(), second.to_string_lossy().into_owned());
        assert_eq!(req.options(&environ)[1].default, Some(Value::from("second")));
    }

    #[test]
    fn unknown_env_name_is_unsatisfied() {
        let (_temp, environ, state) = setup();
        let req = CondaEnvRequirement::new(vec![]);
        let overrides = UserConfigOverrides::new().with(CONDA_ENV_VAR, "env_name", "nope");
        let st = req.check_status(&environ, &state, ProvideMode::Default, &overrides);
        assert_eq!(st.description(), "Environment nope is not defined in the project.");
    }

    #[test]
    fn contribute_prepends_bin_once() {
        let req = CondaEnvRequirement::new(vec![]);
        let mut environ = Environ::new();
        environ.insert(CONDA_ENV_VAR.into(), "/p/envs/default".into());
        environ.insert("PATH".into(), "foo:bar".into());

        req.contribute(&mut environ);
        assert_eq!(environ["PATH"], "/p/envs/default/bin:foo:bar");
        assert_eq!(environ[CONDA_DEFAULT_ENV_VAR], "/p/envs/default");

        req.contribute(&mut environ);
        assert_eq!(environ["PATH"], "/p/envs/default/bin:foo:bar");
    }
}
