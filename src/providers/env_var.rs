//! Provider for plain runtime variables.

use crate::providers::{downcast, ProvideContext, Provider, ProviderConfig, ProviderOption, ProvisionError};
use crate::requirements::env_var::{EnvVarRequirement, SOURCE_DEFAULT, SOURCE_VARIABLES};
use crate::requirements::{Environ, Requirement};

/// Sets a variable from a typed-in value or the project's default.
#[derive(Debug, Default)]
pub struct EnvVarProvider;

impl EnvVarProvider {
    pub const CLASS_NAME: &'static str = "EnvVarProvider";
}

impl Provider for EnvVarProvider {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn option_schema(&self, requirement: &dyn Requirement, environ: &Environ) -> Vec<ProviderOption> {
        requirement
            .as_any()
            .downcast_ref::<EnvVarRequirement>()
            .map(|r| r.options(environ))
            .unwrap_or_default()
    }

    fn blocking_options(&self, config: &ProviderConfig) -> Vec<String> {
        if config.get_str("source").as_deref() == Some(SOURCE_VARIABLES) && config.is_missing("value") {
            vec!["value".to_string()]
        } else {
            Vec::new()
        }
    }

    fn provide(
        &self,
        requirement: &dyn Requirement,
        ctx: &mut ProvideContext<'_>,
        config: &ProviderConfig,
    ) -> Result<(), ProvisionError> {
        let requirement: &EnvVarRequirement = downcast(requirement, Self::CLASS_NAME)?;
        let var = requirement.env_var();

        let value = match config.get_str("source").as_deref() {
            Some(SOURCE_VARIABLES) => Some(config.get_str("value").ok_or_else(|| {
                ProvisionError::MissingOption {
                    requirement: var.to_string(),
                    option: "value".to_string(),
                }
            })?),
            Some(SOURCE_DEFAULT) => requirement.default_value().map(str::to_string),
            _ => None,
        };

        if let Some(value) = value {
            tracing::debug!("Setting {} from provider configuration", var);
            ctx.environ.insert(var.to_string(), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProvideMode;
    use crate::state::LocalStateFile;
    use tempfile::TempDir;

    fn provide(req: &EnvVarRequirement, config: &ProviderConfig) -> (Result<(), ProvisionError>, Environ) {
        let temp = TempDir::new().unwrap();
        let mut state = LocalStateFile::load_for_directory(temp.path()).unwrap();
        let mut environ = Environ::new();
        let result = {
            let mut ctx = ProvideContext {
                environ: &mut environ,
                local_state: &mut state,
                project_dir: temp.path(),
                mode: ProvideMode::Default,
            };
            EnvVarProvider.provide(req, &mut ctx, config)
        };
        (result, environ)
    }

    #[test]
    fn variables_source_sets_value() {
        let req = EnvVarRequirement::new("FOO");
        let config = ProviderConfig::from_pairs(&[("source", "variables"), ("value", "bar")]);
        let (result, environ) = provide(&req, &config);
        result.unwrap();
        assert_eq!(environ["FOO"], "bar");
    }

    #[test]
    fn default_source_uses_project_default() {
        let req = EnvVarRequirement::new("FOO").with_default("fallback");
        let config = ProviderConfig::from_pairs(&[("source", "default")]);
        let (result, environ) = provide(&req, &config);
        result.unwrap();
        assert_eq!(environ["FOO"], "fallback");
    }

    #[test]
    fn environ_source_changes_nothing() {
        let req = EnvVarRequirement::new("FOO");
        let config = ProviderConfig::from_pairs(&[("source", "environ")]);
        let (result, environ) = provide(&req, &config);
        result.unwrap();
        assert!(environ.is_empty());
    }

    #[test]
    fn variables_without_value_blocks() {
        let config = ProviderConfig::from_pairs(&[("source", "variables")]);
        assert!(EnvVarProvider.blocking_options(&config).is_empty());

        let temp = TempDir::new().unwrap();
        let state = LocalStateFile::load_for_directory(temp.path()).unwrap();
        let req = EnvVarRequirement::new("FOO");
        let config = EnvVarProvider.read_config(&req, &Environ::new(), &state, &Default::default());
        assert_eq!(EnvVarProvider.blocking_options(&config), vec!["value"]);
    }
}
