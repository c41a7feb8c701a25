//! The requirement contract shared by every requirement type.

use serde_yaml::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::project::EnvSpec;
use crate::providers::ProvideMode;
use crate::requirements::registry::PluginRegistry;
use crate::requirements::status::RequirementStatus;
use crate::state::{LocalStateFile, UserConfigOverrides};

/// An environment mapping, kept sorted so output is reproducible.
pub type Environ = BTreeMap<String, String>;

/// Variable the prepare loop sets to the project's directory.
pub const PROJECT_DIR_VAR: &str = "PROJECT_DIR";

/// A declarative precondition bound to one environment variable.
///
/// Requirements are immutable once parsed. `check_status` inspects the
/// world (environment, filesystem) and never mutates the requirement.
pub trait Requirement: Debug + Send + Sync {
    /// The environment variable this requirement governs; unique per project.
    fn env_var(&self) -> &str;

    /// Short human-readable name.
    fn title(&self) -> &str;

    /// Longer explanation, if the project supplied one.
    fn description(&self) -> Option<&str>;

    /// Class name of the provider that can satisfy this requirement.
    fn provider_class_name(&self) -> &'static str;

    /// Check whether the requirement currently holds.
    fn check_status(
        &self,
        environ: &Environ,
        local_state: &LocalStateFile,
        mode: ProvideMode,
        overrides: &UserConfigOverrides,
    ) -> RequirementStatus;

    /// Add whatever this requirement exports beyond its own variable.
    ///
    /// Called once the whole project is satisfied.
    fn contribute(&self, _environ: &mut Environ) {}

    /// Downcasting hook for providers.
    fn as_any(&self) -> &dyn Any;
}

/// What a requirement parser can see besides its own item.
pub struct ParseContext<'a> {
    /// The registry the project is being loaded with.
    pub registry: &'a PluginRegistry,
    /// Environment specs declared by the project, in declaration order.
    pub env_specs: &'a [EnvSpec],
}

/// Signature of a requirement parser.
///
/// On success exactly one requirement is pushed to `requirements`; on any
/// validation failure nothing is pushed and one or more messages are
/// pushed to `problems`.
pub type RequirementParser = fn(
    ctx: &ParseContext<'_>,
    varname: &str,
    item: &Value,
    problems: &mut Vec<String>,
    requirements: &mut Vec<Arc<dyn Requirement>>,
);

/// Render a YAML value the way problem messages quote user input.
pub fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Sequence(items) => {
            let inner: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Mapping(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", repr(k), repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Tagged(tagged) => repr(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_scalars() {
        assert_eq!(repr(&Value::Null), "None");
        assert_eq!(repr(&Value::Bool(true)), "True");
        assert_eq!(repr(&Value::from(3)), "3");
        assert_eq!(repr(&Value::from("x")), "'x'");
    }

    #[test]
    fn repr_collections() {
        assert_eq!(repr(&Value::Sequence(vec![])), "[]");
        let seq: Value = serde_yaml::from_str("[1, a]").unwrap();
        assert_eq!(repr(&seq), "[1, 'a']");
        let map: Value = serde_yaml::from_str("{}").unwrap();
        assert_eq!(repr(&map), "{}");
        let map: Value = serde_yaml::from_str("{a: 1}").unwrap();
        assert_eq!(repr(&map), "{'a': 1}");
    }
}
