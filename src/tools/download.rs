//! HTTP downloads and archive extraction.

use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::providers::ProvisionError;
use crate::tools::command;

/// Operations the download provider needs.
pub trait DownloadTool: Send + Sync {
    /// Fetch `url` into the file `dest`, replacing it.
    fn download(&self, url: &str, dest: &Path) -> Result<(), ProvisionError>;

    /// Unpack a zip archive into `dest_dir`, which is created if needed.
    fn unzip(&self, archive: &Path, dest_dir: &Path) -> Result<(), ProvisionError>;
}

/// [`DownloadTool`] backed by `reqwest` and the system `unzip`.
pub struct HttpDownloader {
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader with the default 5-minute timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(300))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self, url: &str) -> Result<Client, ProvisionError> {
        Client::builder()
            .user_agent("rigup")
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProvisionError::Download {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadTool for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), ProvisionError> {
        let failed = |message: String| ProvisionError::Download {
            url: url.to_string(),
            message,
        };

        tracing::info!("Downloading {} to {}", url, dest.display());
        let response = self
            .client(url)?
            .get(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, &bytes)?;
        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(())
    }

    fn unzip(&self, archive: &Path, dest_dir: &Path) -> Result<(), ProvisionError> {
        fs::create_dir_all(dest_dir)?;
        let args = vec![
            "-q".to_string(),
            "-o".to_string(),
            archive.to_string_lossy().into_owned(),
            "-d".to_string(),
            dest_dir.to_string_lossy().into_owned(),
        ];
        command::run("unzip", &args, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn default_timeout_is_five_minutes() {
        assert_eq!(HttpDownloader::default().timeout(), Duration::from_secs(300));
    }

    #[test]
    fn downloads_body_to_file() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data.csv");
            then.status(200).body("a,b\n1,2\n");
        });

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested").join("data.csv");
        HttpDownloader::new()
            .download(&server.url("/data.csv"), &dest)
            .unwrap();

        mock.assert();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn http_error_is_a_download_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.csv");
            then.status(404).body("Not Found");
        });

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("missing.csv");
        let err = HttpDownloader::new()
            .download(&server.url("/missing.csv"), &dest)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Download { .. }));
        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
    }
}
