//! Plain runtime variables declared under `runtime:`.
//!
//! ```yaml
//! runtime:
//!   API_TOKEN: {}
//!   REGION: us-east-1
//!   LOG_LEVEL:
//!     default: info
//!     description: Verbosity for the service
//! ```

use serde_yaml::Value;
use std::any::Any;
use std::sync::Arc;

use crate::providers::{resolve_config, value_to_string, EnvVarProvider, ProvideMode, ProviderOption};
use crate::requirements::requirement::{repr, Environ, ParseContext, Requirement};
use crate::requirements::status::RequirementStatus;
use crate::state::{LocalStateFile, UserConfigOverrides};

/// Where a runtime variable's value comes from.
pub const SOURCE_ENVIRON: &str = "environ";
pub const SOURCE_VARIABLES: &str = "variables";
pub const SOURCE_DEFAULT: &str = "default";

/// A variable that must have a non-empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvVarRequirement {
    env_var: String,
    title: String,
    description: Option<String>,
    default: Option<String>,
}

impl EnvVarRequirement {
    pub fn new(env_var: &str) -> Self {
        Self {
            env_var: env_var.to_string(),
            title: env_var.to_string(),
            description: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Value the project declares for the variable, if any.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The value currently present in an environment, if non-empty.
    pub fn current_value<'a>(&self, environ: &'a Environ) -> Option<&'a str> {
        environ
            .get(&self.env_var)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Options offered for this variable.
    pub fn options(&self, environ: &Environ) -> Vec<ProviderOption> {
        let mut choices = vec![SOURCE_ENVIRON, SOURCE_VARIABLES];
        if self.default.is_some() {
            choices.push(SOURCE_DEFAULT);
        }

        let source = if self.current_value(environ).is_some() {
            SOURCE_ENVIRON
        } else if self.default.is_some() {
            SOURCE_DEFAULT
        } else {
            SOURCE_VARIABLES
        };

        vec![
            ProviderOption::new("source", "Where the value comes from")
                .with_default(source)
                .with_choices(&choices),
            ProviderOption::new("value", &format!("Value for {}", self.env_var)),
        ]
    }
}

impl Requirement for EnvVarRequirement {
    fn env_var(&self) -> &str {
        &self.env_var
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn provider_class_name(&self) -> &'static str {
        EnvVarProvider::CLASS_NAME
    }

    fn check_status(
        &self,
        environ: &Environ,
        _local_state: &LocalStateFile,
        _mode: ProvideMode,
        _overrides: &UserConfigOverrides,
    ) -> RequirementStatus {
        match self.current_value(environ) {
            Some(_) => RequirementStatus::satisfied(format!(
                "Environment variable {} is set.",
                self.env_var
            )),
            None => RequirementStatus::unsatisfied(format!(
                "Environment variable {} is not set.",
                self.env_var
            )),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parse every entry of the `runtime:` section.
///
/// Variables with a specialized type registered in the registry are handed
/// to that parser instead.
pub fn parse_runtime(
    ctx: &ParseContext<'_>,
    varname: &str,
    item: &Value,
    problems: &mut Vec<String>,
    requirements: &mut Vec<Arc<dyn Requirement>>,
) {
    if let Some(parser) = ctx.registry.env_var_parser(varname) {
        parser(ctx, varname, item, problems, requirements);
        return;
    }
    parse(varname, item, problems, requirements);
}

fn parse(
    varname: &str,
    item: &Value,
    problems: &mut Vec<String>,
    requirements: &mut Vec<Arc<dyn Requirement>>,
) {
    let mut requirement = EnvVarRequirement::new(varname);

    match item {
        Value::Null => {}
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            requirement.default = value_to_string(item);
        }
        Value::Mapping(map) => {
            let before = problems.len();

            match map.get("default") {
                None | Some(Value::Null) => {}
                Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                    requirement.default = value_to_string(v);
                }
                Some(other) => problems.push(format!(
                    "'default' field for runtime variable {} should be a string or number, not {}.",
                    varname,
                    repr(other)
                )),
            }

            match map.get("description") {
                None => {}
                Some(Value::String(s)) => requirement.description = Some(s.clone()),
                Some(_) => problems.push(format!(
                    "'description' field for runtime variable {} is not a string",
                    varname
                )),
            }

            if problems.len() > before {
                return;
            }
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

/// Resolve the options for a runtime variable through the override layers.
pub(crate) fn resolved_source(
    requirement: &EnvVarRequirement,
    environ: &Environ,
    local_state: &LocalStateFile,
    overrides: &UserConfigOverrides,
) -> Option<String> {
    resolve_config(
        &requirement.env_var,
        EnvVarProvider::CLASS_NAME,
        &requirement.options(environ),
        local_state,
        overrides,
    )
    .get_str("source")
}
