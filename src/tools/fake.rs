//! In-memory stand-ins for the external tools, for tests.
//!
//! `FakeConda` lays out `conda-meta` records the way a real environment
//! would, so status checks see a believable prefix. `FakeDownloads` serves
//! registered URLs from memory. Both count calls so tests can assert that
//! a second prepare did no work.
//!
//! # Example
//!
//! ```
//! use rigup::tools::fake::{FakeConda, FakeDownloads};
//! use rigup::tools::ExternalTools;
//! use std::sync::Arc;
//!
//! let conda = Arc::new(FakeConda::new());
//! let downloads = Arc::new(FakeDownloads::new());
//! downloads.serve("http://example.com/data.csv", b"a,b\n");
//!
//! let tools = ExternalTools::new(conda.clone(), downloads.clone());
//! assert_eq!(conda.create_calls(), 0);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::providers::ProvisionError;
use crate::tools::conda::{package_name, CondaApi};
use crate::tools::download::DownloadTool;
use crate::tools::ExternalTools;

/// Fake package manager.
#[derive(Debug, Default)]
pub struct FakeConda {
    state: Mutex<FakeCondaState>,
}

#[derive(Debug, Default)]
struct FakeCondaState {
    create_calls: usize,
    install_calls: usize,
    fail_create: Option<String>,
    unknown_packages: BTreeSet<String>,
}

impl FakeConda {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create` fail with the given message.
    pub fn fail_create(&self, message: &str) {
        self.lock().fail_create = Some(message.to_string());
    }

    /// Make installing a package fail, as if no channel had it.
    pub fn reject_package(&self, name: &str) {
        self.lock().unknown_packages.insert(name.to_string());
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn install_calls(&self) -> usize {
        self.lock().install_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeCondaState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_packages(&self, prefix: &Path, packages: &[String]) -> Result<(), ProvisionError> {
        let unknown = self.lock().unknown_packages.clone();
        if let Some(bad) = packages
            .iter()
            .map(|p| package_name(p))
            .find(|p| unknown.contains(p))
        {
            return Err(ProvisionError::CommandFailed {
                command: format!("conda install --prefix {}", prefix.display()),
                code: Some(1),
                stderr: format!("PackagesNotFoundError: {}", bad),
            });
        }

        let meta = prefix.join("conda-meta");
        fs::create_dir_all(&meta)?;
        for package in packages {
            let record = meta.join(format!("{}-0.1-0.json", package_name(package)));
            if !record.exists() {
                fs::write(record, "{}")?;
            }
        }
        Ok(())
    }
}

impl CondaApi for FakeConda {
    fn create(&self, prefix: &Path, packages: &[String], _channels: &[String]) -> Result<(), ProvisionError> {
        let failure = {
            let mut state = self.lock();
            state.create_calls += 1;
            state.fail_create.clone()
        };
        if let Some(message) = failure {
            return Err(ProvisionError::CommandFailed {
                command: format!("conda create --prefix {}", prefix.display()),
                code: Some(1),
                stderr: message,
            });
        }
        self.write_packages(prefix, packages)
    }

    fn install(&self, prefix: &Path, packages: &[String], _channels: &[String]) -> Result<(), ProvisionError> {
        self.lock().install_calls += 1;
        self.write_packages(prefix, packages)
    }
}

/// Fake HTTP downloader serving registered bodies.
#[derive(Debug, Default)]
pub struct FakeDownloads {
    state: Mutex<FakeDownloadsState>,
}

#[derive(Debug, Default)]
struct FakeDownloadsState {
    bodies: HashMap<String, Vec<u8>>,
    archives: HashMap<String, Vec<(String, Vec<u8>)>>,
    downloads: Vec<String>,
    unzipped: Vec<PathBuf>,
}

impl FakeDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn serve(&self, url: &str, body: &[u8]) {
        self.lock().bodies.insert(url.to_string(), body.to_vec());
    }

    /// Serve an archive at `url` that unpacks to the given files.
    ///
    /// The archive body is opaque; `unzip` writes the listed files.
    pub fn serve_archive(&self, url: &str, files: &[(&str, &str)]) {
        let mut state = self.lock();
        state.bodies.insert(url.to_string(), format!("archive:{}", url).into_bytes());
        state.archives.insert(
            format!("archive:{}", url),
            files.iter().map(|(n, b)| (n.to_string(), b.as_bytes().to_vec())).collect(),
        );
    }

    /// URLs fetched so far, in order.
    pub fn downloads(&self) -> Vec<String> {
        self.lock().downloads.clone()
    }

    /// Directories archives were unpacked into.
    pub fn unzipped(&self) -> Vec<PathBuf> {
        self.lock().unzipped.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeDownloadsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DownloadTool for FakeDownloads {
    fn download(&self, url: &str, dest: &Path) -> Result<(), ProvisionError> {
        let body = {
            let mut state = self.lock();
            state.downloads.push(url.to_string());
            state.bodies.get(url).cloned()
        };
        let body = body.ok_or_else(|| ProvisionError::Download {
            url: url.to_string(),
            message: "HTTP 404 Not Found".to_string(),
        })?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(dest)?;
        file.write_all(&body)?;
        Ok(())
    }

    fn unzip(&self, archive: &Path, dest_dir: &Path) -> Result<(), ProvisionError> {
        let marker = fs::read_to_string(archive)?;
        let files = self.lock().archives.get(&marker).cloned().ok_or_else(|| {
            ProvisionError::CommandFailed {
                command: format!("unzip {}", archive.display()),
                code: Some(9),
                stderr: "End-of-central-directory signature not found.".to_string(),
            }
        })?;

        fs::create_dir_all(dest_dir)?;
        for (name, body) in files {
            fs::write(dest_dir.join(name), body)?;
        }
        self.lock().unzipped.push(dest_dir.to_path_buf());
        Ok(())
    }
}

/// Tools backed by fresh fakes.
pub fn fake_tools() -> ExternalTools {
    ExternalTools::new(Arc::new(FakeConda::new()), Arc::new(FakeDownloads::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_writes_conda_meta() {
        let temp = TempDir::new().unwrap();
        let conda = FakeConda::new();
        conda
            .create(temp.path(), &["numpy>=1".to_string()], &[])
            .unwrap();
        assert!(temp.path().join("conda-meta/numpy-0.1-0.json").exists());
        assert_eq!(conda.create_calls(), 1);
    }

    #[test]
    fn rejected_package_fails_install() {
        let temp = TempDir::new().unwrap();
        let conda = FakeConda::new();
        conda.reject_package("boguspackage");
        let err = conda
            .install(temp.path(), &["boguspackage".to_string()], &[])
            .unwrap_err();
        assert!(err.to_string().contains("boguspackage"));
    }

    #[test]
    fn unknown_url_is_a_download_error() {
        let temp = TempDir::new().unwrap();
        let downloads = FakeDownloads::new();
        let err = downloads
            .download("http://example.com/nope", &temp.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
        assert_eq!(downloads.downloads(), vec!["http://example.com/nope"]);
    }

    #[test]
    fn archives_unpack_registered_files() {
        let temp = TempDir::new().unwrap();
        let downloads = FakeDownloads::new();
        downloads.serve_archive("http://example.com/a.zip", &[("inner.txt", "hi")]);

        let archive = temp.path().join("a.zip.part");
        downloads.download("http://example.com/a.zip", &archive).unwrap();
        downloads.unzip(&archive, &temp.path().join("a")).unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("a/inner.txt")).unwrap(), "hi");
    }
}
