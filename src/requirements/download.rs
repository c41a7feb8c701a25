//! Files fetched over HTTP, declared under `downloads:`.
//!
//! ```yaml
//! downloads:
//!   DATAFILE: https://example.com/data.csv
//!   SAMPLES:
//!     url: https://example.com/samples.zip
//!     sha256: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//!     description: Sample inputs
//! ```
//!
//! The variable ends up holding the path of the downloaded file (or of the
//! unpacked directory when the download is a zip archive).

use md5::Digest as _;
use serde_yaml::Value;
use sha2::Digest as _;
use std::any::Any;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::providers::{resolve_path, DownloadProvider, ProvideMode, ProviderOption};
use crate::requirements::requirement::{repr, Environ, ParseContext, Requirement};
use crate::requirements::status::RequirementStatus;
use crate::state::{LocalStateFile, UserConfigOverrides};

pub const SOURCE_DOWNLOAD: &str = "download";
pub const SOURCE_ENVIRON: &str = "environ";
pub const SOURCE_VARIABLES: &str = "variables";

/// Checksum algorithms a download may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm, in the order they are looked up.
    pub const ALL: [HashAlgorithm; 5] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    /// Field name used in the project file.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Hex digest of some bytes.
    pub fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => hex::encode(md5::Md5::digest(bytes).as_slice()),
            HashAlgorithm::Sha224 => hex::encode(sha2::Sha224::digest(bytes).as_slice()),
            HashAlgorithm::Sha256 => hex::encode(sha2::Sha256::digest(bytes).as_slice()),
            HashAlgorithm::Sha384 => hex::encode(sha2::Sha384::digest(bytes).as_slice()),
            HashAlgorithm::Sha512 => hex::encode(sha2::Sha512::digest(bytes).as_slice()),
        }
    }

    /// Hex digest of a file's contents.
    pub fn hex_digest_file(&self, path: &Path) -> std::io::Result<String> {
        let bytes = fs::read(path)?;
        Ok(self.hex_digest(&bytes))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A file that must be downloaded and, optionally, verified and unpacked.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequirement {
    pub env_var: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub filename: String,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub hash_value: Option<String>,
    pub unzip: bool,
}

impl DownloadRequirement {
    /// A download with defaults filled in the way the project parser does.
    pub fn new(env_var: &str, url: &str, filename: &str) -> Self {
        Self {
            env_var: env_var.to_string(),
            title: env_var.to_string(),
            description: None,
            url: url.to_string(),
            filename: filename.to_string(),
            hash_algorithm: None,
            hash_value: None,
            unzip: false,
        }
    }

    pub fn with_hash(mut self, algorithm: HashAlgorithm, value: &str) -> Self {
        self.hash_algorithm = Some(algorithm);
        self.hash_value = Some(value.to_string());
        self
    }

    pub fn with_unzip(mut self, unzip: bool) -> Self {
        self.unzip = unzip;
        self
    }

    /// Options offered for this download.
    pub fn options(&self, environ: &Environ) -> Vec<ProviderOption> {
        let source = if environ.get(&self.env_var).is_some_and(|v| !v.is_empty()) {
            SOURCE_ENVIRON
        } else {
            SOURCE_DOWNLOAD
        };
        vec![
            ProviderOption::new("source", "Where the file comes from")
                .with_default(source)
                .with_choices(&[SOURCE_DOWNLOAD, SOURCE_ENVIRON, SOURCE_VARIABLES]),
            ProviderOption::new("value", &format!("Path to use for {}", self.env_var)),
        ]
    }

    /// Why an existing artifact is unacceptable, if it is.
    ///
    /// Directories are what unzipped downloads leave behind; they carry no
    /// checksum to verify.
    pub fn verify(&self, path: &Path) -> Option<String> {
        if !path.exists() {
            return Some(format!("File not found: {}", path.display()));
        }
        if path.is_dir() {
            return None;
        }
        let (Some(algorithm), Some(expected)) = (self.hash_algorithm, &self.hash_value) else {
            return None;
        };
        match algorithm.hex_digest_file(path) {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => None,
            Ok(actual) => Some(format!(
                "File download checksum error for {}: {} is {}, expected {}",
                path.display(),
                algorithm,
                actual,
                expected
            )),
            Err(e) => Some(format!("Failed to read {}: {}", path.display(), e)),
        }
    }
}

impl Requirement for DownloadRequirement {
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
        DownloadProvider::CLASS_NAME
    }

    fn check_status(
        &self,
        environ: &Environ,
        _local_state: &LocalStateFile,
        _mode: ProvideMode,
        _overrides: &UserConfigOverrides,
    ) -> RequirementStatus {
        let Some(value) = environ.get(&self.env_var).filter(|v| !v.is_empty()) else {
            return RequirementStatus::unsatisfied(format!(
                "Environment variable {} is not set.",
                self.env_var
            ));
        };

        let path = resolve_path(value, environ);
        match self.verify(&path) {
            Some(problem) => RequirementStatus::unsatisfied(problem),
            None => RequirementStatus::satisfied(format!("File downloaded to {}", path.display())),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parse one entry of the `downloads:` section.
pub fn parse(
    _ctx: &ParseContext<'_>,
    varname: &str,
    item: &Value,
    problems: &mut Vec<String>,
    requirements: &mut Vec<Arc<dyn Requirement>>,
) {
    let map = match item {
        Value::String(url) => {
            let mut mapping = serde_yaml::Mapping::new();
            mapping.insert(Value::from("url"), Value::from(url.clone()));
            mapping
        }
        Value::Mapping(map) => map.clone(),
        _ => {
            problems.push(format!(
                "Download name {} should be followed by a URL string or a dictionary describing the download.",
                varname
            ));
            return;
        }
    };

    let url = match map.get("url") {
        Some(Value::String(url)) => url.clone(),
        _ => {
            problems.push(format!(
                "Download item {} doesn't contain a 'url' field.",
                varname
            ));
            return;
        }
    };

    let before = problems.len();

    let mut hash = None;
    for algorithm in HashAlgorithm::ALL {
        match map.get(algorithm.name()) {
            None => {}
            Some(Value::String(value)) => {
                if hash.is_some() {
                    problems.push(format!(
                        "Multiple checksums for download {}.",
                        varname
                    ));
                } else {
                    hash = Some((algorithm, value.clone()));
                }
            }
            Some(other) => problems.push(format!(
                "Checksum value for {} should be a string not {}.",
                varname,
                repr(other)
            )),
        }
    }

    let description = match map.get("description") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            problems.push(format!(
                "'description' field for download item {} is not a string",
                varname
            ));
            None
        }
    };

    let explicit_filename = match map.get("filename") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            problems.push(format!(
                "'filename' field for download item {} should be a string, not {}.",
                varname,
                repr(other)
            ));
            None
        }
    };

    let unzip = match map.get("unzip") {
        None => infer_unzip(&url, explicit_filename.as_deref()),
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            problems.push(format!(
                "Value of 'unzip' for download item {} should be a boolean, not {}.",
                varname,
                repr(other)
            ));
            false
        }
    };

    if problems.len() > before {
        return;
    }

    let filename = explicit_filename.unwrap_or_else(|| default_filename(varname, &url, unzip));

    let mut requirement = DownloadRequirement::new(varname, &url, &filename).with_unzip(unzip);
    requirement.description = description;
    if let Some((algorithm, value)) = hash {
        requirement = requirement.with_hash(algorithm, &value);
    }

    requirements.push(Arc::new(requirement));
}

fn infer_unzip(url: &str, filename: Option<&str>) -> bool {
    url.ends_with(".zip") && !filename.is_some_and(|f| f.ends_with(".zip"))
}

fn default_filename(varname: &str, url: &str, unzip: bool) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    let basename = after_scheme
        .split_once('/')
        .map(|(_, rest)| rest.rsplit('/').next().unwrap_or(""))
        .unwrap_or("");

    if basename.is_empty() {
        return varname.to_string();
    }
    match basename.strip_suffix(".zip") {
        Some(stem) if unzip && !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}
