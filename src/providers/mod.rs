//! Providers satisfy requirements.
//!
//! A provider exposes an option schema for each requirement it handles,
//! resolves option values through the override layers, and performs the
//! provisioning work through injected external tools.
//!
//! Option resolution order, first hit wins:
//!
//! 1. [`UserConfigOverrides`] for the current invocation
//! 2. [`LocalStateFile`] at `[requirement][provider][option]`
//! 3. the provider's default, which may depend on the current environment

pub mod conda_env;
pub mod download;
pub mod env_var;
pub mod error;

pub use conda_env::CondaEnvProvider;
pub use download::DownloadProvider;
pub use env_var::EnvVarProvider;
pub use error::ProvisionError;

use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::requirements::{Environ, Requirement};
use crate::state::{LocalStateFile, UserConfigOverrides};

/// How far a prepare run is allowed to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvideMode {
    /// Check and provision.
    #[default]
    Default,
    /// Check only; never provision and never negotiate.
    Check,
}

impl ProvideMode {
    /// Whether providers may change the world in this mode.
    pub fn provisions(&self) -> bool {
        matches!(self, ProvideMode::Default)
    }
}

/// One configurable option a provider exposes for a requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderOption {
    /// Option key, as stored in overrides and local state.
    pub name: String,
    /// Label shown to the user.
    pub label: String,
    /// Fallback value when neither overrides nor local state have one.
    pub default: Option<Value>,
    /// Allowed values; empty means free-form.
    pub choices: Vec<String>,
}

impl ProviderOption {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default: None,
            choices: Vec::new(),
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Option values resolved for one requirement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    values: BTreeMap<String, Value>,
    missing: Vec<String>,
}

impl ProviderConfig {
    /// Resolved value of an option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Resolved value of an option rendered as a string.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(value_to_string)
    }

    /// Every resolved value, in option-name order.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Options that resolved to nothing in any layer.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Whether an option resolved to nothing.
    pub fn is_missing(&self, name: &str) -> bool {
        self.missing.iter().any(|m| m == name)
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
            missing: Vec::new(),
        }
    }
}

/// Resolve every option of a schema through the override layers.
pub fn resolve_config(
    requirement: &str,
    provider: &str,
    options: &[ProviderOption],
    local_state: &LocalStateFile,
    overrides: &UserConfigOverrides,
) -> ProviderConfig {
    let mut config = ProviderConfig::default();

    for option in options {
        let value = overrides
            .get(requirement, &option.name)
            .or_else(|| local_state.provider_option(requirement, provider, &option.name))
            .or(option.default.as_ref())
            .filter(|v| !v.is_null());

        match value {
            Some(v) => {
                config.values.insert(option.name.clone(), v.clone());
            }
            None => config.missing.push(option.name.clone()),
        }
    }

    config
}

/// Render a scalar option value as a string.
///
/// Returns `None` for null and for collections.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => value_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// What a provider may touch while provisioning.
pub struct ProvideContext<'a> {
    /// Environment being built; providers set their variable here.
    pub environ: &'a mut Environ,
    /// Working copy of the local state, for bookkeeping.
    pub local_state: &'a mut LocalStateFile,
    /// Root of the project being prepared.
    pub project_dir: &'a Path,
    /// Mode of the current run.
    pub mode: ProvideMode,
}

/// Something that knows how to satisfy one or more requirement types.
pub trait Provider: Send + Sync {
    /// Registry key of this provider.
    fn class_name(&self) -> &'static str;

    /// Options this provider exposes for a requirement.
    fn option_schema(&self, requirement: &dyn Requirement, environ: &Environ)
        -> Vec<ProviderOption>;

    /// Resolve option values for a requirement.
    fn read_config(
        &self,
        requirement: &dyn Requirement,
        environ: &Environ,
        local_state: &LocalStateFile,
        overrides: &UserConfigOverrides,
    ) -> ProviderConfig {
        resolve_config(
            requirement.env_var(),
            self.class_name(),
            &self.option_schema(requirement, environ),
            local_state,
            overrides,
        )
    }

    /// Missing options that prevent provisioning with this configuration.
    fn blocking_options(&self, _config: &ProviderConfig) -> Vec<String> {
        Vec::new()
    }

    /// Try to make the requirement hold.
    ///
    /// Implementations must short-circuit when the artifact already exists
    /// and is valid, so a second run performs no side effect.
    fn provide(
        &self,
        requirement: &dyn Requirement,
        ctx: &mut ProvideContext<'_>,
        config: &ProviderConfig,
    ) -> Result<(), ProvisionError>;
}

/// Downcast a requirement to the concrete type a provider handles.
pub(crate) fn downcast<'a, T: 'static>(
    requirement: &'a dyn Requirement,
    provider: &'static str,
) -> Result<&'a T, ProvisionError> {
    requirement
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProvisionError::WrongRequirement {
            provider,
            requirement: requirement.env_var().to_string(),
        })
}

/// Resolve a possibly relative path against the project directory.
pub(crate) fn resolve_path(value: &str, environ: &Environ) -> std::path::PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match environ.get(crate::requirements::PROJECT_DIR_VAR) {
        Some(dir) => Path::new(dir).join(path),
        None => path.to_path_buf(),
    }
}
