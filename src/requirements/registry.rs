//! Registry of requirement parsers and providers.
//!
//! The registry is built once and passed by reference to project loading
//! and to the prepare loop. Built-ins are registered by [`PluginRegistry::new`];
//! further types can be added with the `register_*` methods before the
//! registry is shared.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::providers::{CondaEnvProvider, DownloadProvider, EnvVarProvider, Provider};
use crate::requirements::conda_env::{self, CONDA_ENV_VAR};
use crate::requirements::requirement::RequirementParser;
use crate::requirements::{download, env_var};
use crate::tools::ExternalTools;

/// Lookup tables from discriminants to parsers and providers.
pub struct PluginRegistry {
    section_order: Vec<String>,
    sections: HashMap<String, RequirementParser>,
    env_vars: HashMap<String, RequirementParser>,
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl PluginRegistry {
    /// Registry with the built-in types, backed by the real external tools.
    pub fn new() -> Self {
        Self::with_tools(ExternalTools::system())
    }

    /// Registry with the built-in types, backed by the given tools.
    pub fn with_tools(tools: ExternalTools) -> Self {
        let mut registry = Self::empty();

        registry.register_section("runtime", env_var::parse_runtime);
        registry.register_section("downloads", download::parse);
        registry.register_env_var(CONDA_ENV_VAR, conda_env::parse);

        registry.register_provider(Arc::new(EnvVarProvider));
        registry.register_provider(Arc::new(DownloadProvider::new(tools.downloads.clone())));
        registry.register_provider(Arc::new(CondaEnvProvider::new(tools.conda.clone())));

        registry
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            section_order: Vec::new(),
            sections: HashMap::new(),
            env_vars: HashMap::new(),
            providers: HashMap::new(),
        }
    }

    /// Register the parser for a top-level project file section.
    ///
    /// Sections are parsed in registration order. Registering a section
    /// twice replaces its parser but keeps its position.
    pub fn register_section(&mut self, section: &str, parser: RequirementParser) {
        if self.sections.insert(section.to_string(), parser).is_none() {
            self.section_order.push(section.to_string());
        }
    }

    /// Register a specialized parser for a runtime variable name.
    pub fn register_env_var(&mut self, var: &str, parser: RequirementParser) {
        self.env_vars.insert(var.to_string(), parser);
    }

    /// Register a provider under its class name.
    pub fn register_provider(&mut self, provider: Arc<dyn Provider>) {
        self.providers
            .insert(provider.class_name().to_string(), provider);
    }

    /// Look up a provider by class name.
    ///
    /// An unknown name is not an error here; callers decide whether it is fatal.
    pub fn find_provider_by_class_name(&self, class_name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(class_name).cloned()
    }

    /// Section names with their parsers, in registration order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, RequirementParser)> + '_ {
        self.section_order
            .iter()
            .filter_map(|name| self.sections.get(name).map(|p| (name.as_str(), *p)))
    }

    /// Parser for a section, if registered.
    pub fn section_parser(&self, section: &str) -> Option<RequirementParser> {
        self.sections.get(section).copied()
    }

    /// Specialized parser for a runtime variable, if registered.
    pub fn env_var_parser(&self, var: &str) -> Option<RequirementParser> {
        self.env_vars.get(var).copied()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&String> = self.providers.keys().collect();
        providers.sort();
        f.debug_struct("PluginRegistry")
            .field("sections", &self.section_order)
            .field("providers", &providers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::fake_tools;

    #[test]
    fn finds_builtin_providers() {
        let registry = PluginRegistry::with_tools(fake_tools());
        for name in ["EnvVarProvider", "DownloadProvider", "CondaEnvProvider"] {
            let found = registry.find_provider_by_class_name(name).unwrap();
            assert_eq!(found.class_name(), name);
        }
    }

    #[test]
    fn unknown_provider_is_none() {
        let registry = PluginRegistry::with_tools(fake_tools());
        assert!(registry.find_provider_by_class_name("NopeProvider").is_none());
    }

    #[test]
    fn sections_keep_registration_order() {
        let registry = PluginRegistry::with_tools(fake_tools());
        let names: Vec<&str> = registry.sections().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["runtime", "downloads"]);
    }

    #[test]
    fn conda_variable_has_a_specialized_parser() {
        let registry = PluginRegistry::with_tools(fake_tools());
        assert!(registry.env_var_parser("CONDA_ENV_PATH").is_some());
        assert!(registry.env_var_parser("DATAFILE").is_none());
    }

    #[test]
    fn empty_registry_has_nothing() {
        let registry = PluginRegistry::empty();
        assert_eq!(registry.sections().count(), 0);
        assert!(registry.find_provider_by_class_name("EnvVarProvider").is_none());
    }

    #[test]
    fn reregistering_a_section_keeps_its_position() {
        let mut registry = PluginRegistry::with_tools(fake_tools());
        registry.register_section("runtime", env_var::parse_runtime);
        let names: Vec<&str> = registry.sections().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["runtime", "downloads"]);
    }
}
