//! The conda package manager.

use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::providers::ProvisionError;
use crate::tools::command;

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)").unwrap());

/// Operations the conda provider needs from the package manager.
pub trait CondaApi: Send + Sync {
    /// Create a new environment at `prefix` with the given packages.
    fn create(&self, prefix: &Path, packages: &[String], channels: &[String]) -> Result<(), ProvisionError>;

    /// Install packages into an existing environment.
    fn install(&self, prefix: &Path, packages: &[String], channels: &[String]) -> Result<(), ProvisionError>;
}

/// [`CondaApi`] backed by the `conda` binary.
#[derive(Debug, Clone)]
pub struct CondaCli {
    program: String,
}

impl CondaCli {
    pub fn new() -> Self {
        Self::with_program("conda")
    }

    /// Use a specific conda executable.
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn args(verb: &str, prefix: &Path, packages: &[String], channels: &[String]) -> Vec<String> {
        let mut args = vec![
            verb.to_string(),
            "--yes".to_string(),
            "--quiet".to_string(),
            "--prefix".to_string(),
            prefix.to_string_lossy().into_owned(),
        ];
        for channel in channels {
            args.push("--channel".to_string());
            args.push(channel.clone());
        }
        args.extend(packages.iter().cloned());
        args
    }
}

impl Default for CondaCli {
    fn default() -> Self {
        Self::new()
    }
}

impl CondaApi for CondaCli {
    fn create(&self, prefix: &Path, packages: &[String], channels: &[String]) -> Result<(), ProvisionError> {
        // conda refuses to create an environment with no packages at all
        let packages = if packages.is_empty() {
            vec!["python".to_string()]
        } else {
            packages.to_vec()
        };
        command::run(&self.program, &Self::args("create", prefix, &packages, channels), None)?;
        Ok(())
    }

    fn install(&self, prefix: &Path, packages: &[String], channels: &[String]) -> Result<(), ProvisionError> {
        if packages.is_empty() {
            return Ok(());
        }
        command::run(&self.program, &Self::args("install", prefix, packages, channels), None)?;
        Ok(())
    }
}

/// Whether a directory holds a conda environment.
pub fn is_conda_prefix(prefix: &Path) -> bool {
    prefix.join("conda-meta").is_dir()
}

/// Names of the packages installed in an environment.
///
/// Reads the `conda-meta/<name>-<version>-<build>.json` records; an
/// unreadable or missing directory yields an empty set.
pub fn installed_packages(prefix: &Path) -> BTreeSet<String> {
    let Ok(entries) = fs::read_dir(prefix.join("conda-meta")) else {
        return BTreeSet::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let stem = name.strip_suffix(".json")?;
            stem.rsplitn(3, '-').last().map(str::to_string)
        })
        .collect()
}

/// Package name of a spec such as `numpy>=1.20` or `python 3.11`.
pub fn package_name(spec: &str) -> String {
    PACKAGE_NAME
        .captures(spec)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| spec.trim().to_string())
}
