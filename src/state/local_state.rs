//! Durable per-project provider configuration.
//!
//! The local state file lives at `<project>/.rigup/local_state.yml` and
//! records the provider options a user chose on earlier runs, plus any
//! provider bookkeeping. The document is an arbitrary YAML mapping: keys the
//! current build does not understand are carried through a load/save cycle
//! untouched.
//!
//! ```yaml
//! CONDA_ENV_PATH:
//!   CondaEnvProvider:
//!     source: project
//!     env_name: default
//! DATAFILE:
//!   DownloadProvider:
//!     downloaded_at: 2026-01-01T00:00:00+00:00
//! ```

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, RigupError};

/// Per-project store of previously chosen provider configuration.
#[derive(Debug, Clone)]
pub struct LocalStateFile {
    path: PathBuf,
    root: Mapping,
    dirty: bool,
}

impl LocalStateFile {
    /// Directory (relative to the project) holding rigup's private files.
    pub const DIRNAME: &'static str = ".rigup";

    /// File name of the local state document.
    pub const FILENAME: &'static str = "local_state.yml";

    /// Path of the local state file for a project directory.
    pub fn path_for_directory(directory: &Path) -> PathBuf {
        directory.join(Self::DIRNAME).join(Self::FILENAME)
    }

    /// Load the local state for a project directory.
    ///
    /// A missing file yields an empty document; it is created on the first
    /// save that has something to write.
    pub fn load_for_directory(directory: &Path) -> Result<Self> {
        let path = Self::path_for_directory(directory);

        if !path.exists() {
            tracing::debug!("No local state at {}", path.display());
            return Ok(Self {
                path,
                root: Mapping::new(),
                dirty: false,
            });
        }

        let content = fs::read_to_string(&path)?;
        let value: Value =
            serde_yaml::from_str(&content).map_err(|e| RigupError::StateParseError {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let root = match value {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            other => {
                return Err(RigupError::StateParseError {
                    path,
                    message: format!(
                        "top level should be a mapping, not {}",
                        crate::requirements::repr(&other)
                    ),
                })
            }
        };

        Ok(Self {
            path,
            root,
            dirty: false,
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The whole document.
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Look up a value by key path.
    pub fn get_value(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.root;
        for key in parents {
            current = current.get(*key)?.as_mapping()?;
        }
        current.get(*last)
    }

    /// Set a value by key path, creating intermediate mappings.
    ///
    /// Sibling keys are never touched. A non-mapping value sitting where an
    /// intermediate mapping is needed is replaced.
    pub fn set_value(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for key in parents {
            let slot = current
                .entry(Value::from(*key))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !slot.is_mapping() {
                *slot = Value::Mapping(Mapping::new());
            }
            current = match slot {
                Value::Mapping(m) => m,
                _ => return,
            };
        }

        if current.get(*last) != Some(&value) {
            current.insert(Value::from(*last), value);
            self.dirty = true;
        }
    }

    /// Remove a value by key path. Empty parents are left in place.
    pub fn unset_value(&mut self, path: &[&str]) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut current = &mut self.root;
        for key in parents {
            current = match current.get_mut(*key) {
                Some(Value::Mapping(m)) => m,
                _ => return,
            };
        }
        if current.remove(*last).is_some() {
            self.dirty = true;
        }
    }

    /// Stored option value for a requirement's provider.
    pub fn provider_option(&self, requirement: &str, provider: &str, option: &str) -> Option<&Value> {
        self.get_value(&[requirement, provider, option])
    }

    /// Record an option value for a requirement's provider.
    pub fn set_provider_option(
        &mut self,
        requirement: &str,
        provider: &str,
        option: &str,
        value: Value,
    ) {
        self.set_value(&[requirement, provider, option], value);
    }

    /// Save to disk if anything changed, using atomic write.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = serde_yaml::to_string(&self.root).map_err(|e| RigupError::StateWriteError {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let temp_path = self.path.with_extension("yml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!("Saved local state to {}", self.path.display());
        self.dirty = false;
        Ok(())
    }
}
