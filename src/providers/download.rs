//! Provider for downloaded files.

use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::providers::{
    downcast, resolve_path, ProvideContext, Provider, ProviderConfig, ProviderOption, ProvisionError,
};
use crate::requirements::download::{DownloadRequirement, SOURCE_DOWNLOAD, SOURCE_VARIABLES};
use crate::requirements::{Environ, Requirement};
use crate::tools::DownloadTool;

/// Downloads, verifies and unpacks files into the project directory.
pub struct DownloadProvider {
    tool: Arc<dyn DownloadTool>,
}

impl DownloadProvider {
    pub const CLASS_NAME: &'static str = "DownloadProvider";

    pub fn new(tool: Arc<dyn DownloadTool>) -> Self {
        Self { tool }
    }

    /// Make sure the artifact is in place, returning its path and whether
    /// anything was fetched.
    fn fetch(
        &self,
        requirement: &DownloadRequirement,
        project_dir: &Path,
    ) -> Result<(PathBuf, bool), ProvisionError> {
        let target = project_dir.join(&requirement.filename);
        if requirement.verify(&target).is_none() {
            tracing::debug!("{} already present at {}", requirement.env_var, target.display());
            return Ok((target, false));
        }

        let partial = partial_path(&target);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ProvisionError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.tool.download(&requirement.url, &partial)?;

        if let Err(e) = self.finish(requirement, &partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        Ok((target, true))
    }

    fn finish(&self, requirement: &DownloadRequirement, partial: &Path, target: &Path) -> Result<(), ProvisionError> {
        if let (Some(algorithm), Some(expected)) = (requirement.hash_algorithm, &requirement.hash_value) {
            let actual = algorithm.hex_digest_file(partial)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ProvisionError::ChecksumMismatch {
                    url: requirement.url.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        if requirement.unzip {
            self.tool.unzip(partial, target)?;
            fs::remove_file(partial)?;
        } else {
            fs::rename(partial, target).map_err(|source| ProvisionError::Write {
                path: target.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Hidden sibling of `target` that a download is written to first.
fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.part", name))
}

impl Provider for DownloadProvider {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn option_schema(&self, requirement: &dyn Requirement, environ: &Environ) -> Vec<ProviderOption> {
        requirement
            .as_any()
            .downcast_ref::<DownloadRequirement>()
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
        let requirement: &DownloadRequirement = downcast(requirement, Self::CLASS_NAME)?;
        let var = requirement.env_var.as_str();

        match config.get_str("source").as_deref() {
            Some(SOURCE_DOWNLOAD) => {
                let (target, fetched) = self.fetch(requirement, ctx.project_dir)?;
                if fetched {
                    ctx.local_state.set_provider_option(
                        var,
                        Self::CLASS_NAME,
                        "downloaded_at",
                        Value::from(chrono::Utc::now().to_rfc3339()),
                    );
                }
                ctx.environ
                    .insert(var.to_string(), target.to_string_lossy().into_owned());
            }
            Some(SOURCE_VARIABLES) => {
                let value = config.get_str("value").ok_or_else(|| ProvisionError::MissingOption {
                    requirement: var.to_string(),
                    option: "value".to_string(),
                })?;
                let path = resolve_path(&value, &*ctx.environ);
                ctx.environ
                    .insert(var.to_string(), path.to_string_lossy().into_owned());
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProvideMode;
    use crate::requirements::HashAlgorithm;
    use crate::state::LocalStateFile;
    use crate::tools::fake::FakeDownloads;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        downloads: Arc<FakeDownloads>,
        provider: DownloadProvider,
        state: LocalStateFile,
        environ: Environ,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let downloads = Arc::new(FakeDownloads::new());
        let provider = DownloadProvider::new(downloads.clone());
        let state = LocalStateFile::load_for_directory(temp.path()).unwrap();
        Fixture {
            temp,
            downloads,
            provider,
            state,
            environ: Environ::new(),
        }
    }

    impl Fixture {
        fn provide(&mut self, req: &DownloadRequirement, config: &ProviderConfig) -> Result<(), ProvisionError> {
            let mut ctx = ProvideContext {
                environ: &mut self.environ,
                local_state: &mut self.state,
                project_dir: self.temp.path(),
                mode: ProvideMode::Default,
            };
            self.provider.provide(req, &mut ctx, config)
        }
    }

    fn download_config() -> ProviderConfig {
        ProviderConfig::from_pairs(&[("source", "download")])
    }

    #[test]
    fn downloads_into_project_dir() {
        let mut f = fixture();
        f.downloads.serve("http://example.com/data.csv", b"a,b\n");
        let req = DownloadRequirement::new("DATAFILE", "http://example.com/data.csv", "data.csv");

        f.provide(&req, &download_config()).unwrap();

        let target = f.temp.path().join("data.csv");
        assert_eq!(fs::read_to_string(&target).unwrap(), "a,b\n");
        assert_eq!(f.environ["DATAFILE"], target.to_string_lossy());
        assert!(!f.temp.path().join(".data.csv.part").exists());
        assert!(f
            .state
            .provider_option("DATAFILE", "DownloadProvider", "downloaded_at")
            .is_some());
    }

    #[test]
    fn existing_valid_file_is_not_downloaded_again() {
        let mut f = fixture();
        fs::write(f.temp.path().join("data.csv"), "cached").unwrap();
        let req = DownloadRequirement::new("DATAFILE", "http://example.com/data.csv", "data.csv");

        f.provide(&req, &download_config()).unwrap();

        assert!(f.downloads.downloads().is_empty());
        assert!(!f.state.is_dirty());
    }

    #[test]
    fn checksum_mismatch_discards_the_download() {
        let mut f = fixture();
        f.downloads.serve("http://example.com/data.csv", b"abc");
        let req = DownloadRequirement::new("DATAFILE", "http://example.com/data.csv", "data.csv")
            .with_hash(HashAlgorithm::Md5, "00000000000000000000000000000000");

        let err = f.provide(&req, &download_config()).unwrap_err();

        assert!(matches!(err, ProvisionError::ChecksumMismatch { .. }));
        assert!(!f.temp.path().join("data.csv").exists());
        assert!(!f.temp.path().join(".data.csv.part").exists());
        assert!(!f.environ.contains_key("DATAFILE"));
    }

    #[test]
    fn zip_downloads_are_unpacked() {
        let mut f = fixture();
        f.downloads
            .serve_archive("http://example.com/bar.zip", &[("inner.txt", "hello")]);
        let req = DownloadRequirement::new("FOO", "http://example.com/bar.zip", "bar").with_unzip(true);

        f.provide(&req, &download_config()).unwrap();

        let dir = f.temp.path().join("bar");
        assert_eq!(fs::read_to_string(dir.join("inner.txt")).unwrap(), "hello");
        assert!(!f.temp.path().join(".bar.part").exists());
    }

    #[test]
    fn nested_filename_creates_its_directory() {
        let mut f = fixture();
        f.downloads.serve("http://example.com/data.csv", b"a,b\n");
        let req = DownloadRequirement::new("DATAFILE", "http://example.com/data.csv", "data/data.csv");

        f.provide(&req, &download_config()).unwrap();

        let target = f.temp.path().join("data").join("data.csv");
        assert_eq!(fs::read_to_string(&target).unwrap(), "a,b\n");
        assert_eq!(f.environ["DATAFILE"], target.to_string_lossy());
        assert!(!f.temp.path().join("data").join(".data.csv.part").exists());
        assert!(!f.temp.path().join(".data").exists());
    }

    #[test]
    fn partial_file_sits_next_to_the_target() {
        assert_eq!(
            partial_path(Path::new("/p/data/data.csv")),
            PathBuf::from("/p/data/.data.csv.part")
        );
        assert_eq!(partial_path(Path::new("/p/bar")), PathBuf::from("/p/.bar.part"));
    }

    #[test]
    fn variables_source_resolves_relative_paths() {
        let mut f = fixture();
        f.environ.insert(
            "PROJECT_DIR".into(),
            f.temp.path().to_string_lossy().into_owned(),
        );
        let req = DownloadRequirement::new("DATAFILE", "http://example.com/data.csv", "data.csv");
        let config = ProviderConfig::from_pairs(&[("source", "variables"), ("value", "local.csv")]);

        f.provide(&req, &config).unwrap();

        assert_eq!(
            f.environ["DATAFILE"],
            f.temp.path().join("local.csv").to_string_lossy()
        );
        assert!(f.downloads.downloads().is_empty());
    }

    #[test]
    fn failed_download_leaves_nothing_behind() {
        let mut f = fixture();
        let req = DownloadRequirement::new("DATAFILE", "http://example.com/missing.csv", "missing.csv");
        let err = f.provide(&req, &download_config()).unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(!f.temp.path().join("missing.csv").exists());
    }
}
