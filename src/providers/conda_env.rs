//! Provider for the project's conda environment.

use serde_yaml::Value;
use std::sync::Arc;

use crate::providers::{downcast, ProvideContext, Provider, ProviderConfig, ProviderOption, ProvisionError};
use crate::requirements::conda_env::{
    CondaEnvRequirement, CONDA_ENV_VAR, SOURCE_ENVIRON, SOURCE_PROJECT, SOURCE_VARIABLES,
};
use crate::requirements::{Environ, Requirement};
use crate::tools::conda::{is_conda_prefix, package_name};
use crate::tools::CondaApi;

/// Creates or updates a conda environment and points `CONDA_ENV_PATH` at it.
pub struct CondaEnvProvider {
    conda: Arc<dyn CondaApi>,
}

impl CondaEnvProvider {
    pub const CLASS_NAME: &'static str = "CondaEnvProvider";

    pub fn new(conda: Arc<dyn CondaApi>) -> Self {
        Self { conda }
    }
}

impl Provider for CondaEnvProvider {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn option_schema(&self, requirement: &dyn Requirement, environ: &Environ) -> Vec<ProviderOption> {
        requirement
            .as_any()
            .downcast_ref::<CondaEnvRequirement>()
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
        let requirement: &CondaEnvRequirement = downcast(requirement, Self::CLASS_NAME)?;
        let Some(target) = requirement.target(config, &*ctx.environ)? else {
            tracing::debug!("No conda prefix configured; nothing to provide");
            return Ok(());
        };
        let spec = target.spec;
        let prefix = target.prefix.as_path();

        if is_conda_prefix(prefix) {
            let missing = CondaEnvRequirement::missing_packages(spec, prefix);
            if !missing.is_empty() {
                let packages: Vec<String> = spec
                    .dependencies
                    .iter()
                    .filter(|dep| missing.contains(&package_name(dep)))
                    .cloned()
                    .collect();
                tracing::info!(
                    "Installing {} into {}",
                    packages.join(", "),
                    prefix.display()
                );
                self.conda.install(prefix, &packages, &spec.channels)?;
            }
        } else if target.source == SOURCE_ENVIRON {
            return Err(ProvisionError::NotAnEnvironment {
                prefix: target.prefix.clone(),
            });
        } else {
            tracing::info!("Creating conda environment at {}", prefix.display());
            self.conda.create(prefix, &spec.dependencies, &spec.channels)?;
            ctx.local_state.set_provider_option(
                CONDA_ENV_VAR,
                Self::CLASS_NAME,
                "created_at",
                Value::from(chrono::Utc::now().to_rfc3339()),
            );
        }

        if target.source == SOURCE_PROJECT {
            ctx.local_state.set_provider_option(
                CONDA_ENV_VAR,
                Self::CLASS_NAME,
                "env_name",
                Value::from(spec.name.clone()),
            );
        }

        ctx.environ.insert(
            CONDA_ENV_VAR.to_string(),
            prefix.to_string_lossy().into_owned(),
        );
        Ok(())
    }
}
