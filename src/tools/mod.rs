//! External tools providers delegate to.
//!
//! - [`conda`] - The conda package manager
//! - [`download`] - HTTP downloads and zip extraction
//! - [`command`] - Running external programs
//! - [`fake`] - In-memory stand-ins for tests

pub mod command;
pub mod conda;
pub mod download;
pub mod fake;

pub use conda::{CondaApi, CondaCli};
pub use download::{DownloadTool, HttpDownloader};

use std::sync::Arc;

/// The collaborators the built-in providers are constructed with.
#[derive(Clone)]
pub struct ExternalTools {
    pub conda: Arc<dyn CondaApi>,
    pub downloads: Arc<dyn DownloadTool>,
}

impl ExternalTools {
    pub fn new(conda: Arc<dyn CondaApi>, downloads: Arc<dyn DownloadTool>) -> Self {
        Self { conda, downloads }
    }

    /// The real `conda` binary and HTTP client.
    pub fn system() -> Self {
        Self::new(Arc::new(CondaCli::new()), Arc::new(HttpDownloader::new()))
    }
}
