//! Shell activation of a prepared project.

use crate::engine::prepare::prepare;
use crate::engine::result::{PrepareOptions, PrepareResult};
use crate::error::Result;
use crate::project::Project;
use crate::requirements::{Environ, PluginRegistry};
use crate::ui::UiChannel;

/// A prepare run plus the shell lines that apply its environment.
#[derive(Debug, Clone)]
pub struct Activation {
    pub result: PrepareResult,
    /// `export` lines, empty unless the run succeeded.
    pub exports: Vec<String>,
}

/// Prepare a project and render what the caller's shell must export.
pub fn activate(
    project: &mut Project,
    registry: &PluginRegistry,
    environ: &Environ,
    ui: &mut dyn UiChannel,
    options: &PrepareOptions,
) -> Result<Activation> {
    let result = prepare(project, registry, environ, ui, options)?;
    let exports = result
        .environ()
        .map(|prepared| export_lines(prepared, environ))
        .unwrap_or_default();
    Ok(Activation { result, exports })
}

/// `export` lines for every variable whose value differs from `current`,
/// in key order, with values shell-quoted.
pub fn export_lines(prepared: &Environ, current: &Environ) -> Vec<String> {
    prepared
        .iter()
        .filter(|(key, value)| current.get(*key) != Some(*value))
        .map(|(key, value)| format!("export {}={}", key, shell_words::quote(value)))
        .collect()
}
