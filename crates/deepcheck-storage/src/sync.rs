//! Checkpoint download from Google Drive.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};
use crate::manifest::{compute_sha256, should_download, ManifestEntry, ModelManifest};

/// Google Drive direct-download endpoint.
pub const DRIVE_BASE_URL: &str = "https://drive.google.com";

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Present and matching (or no digest to compare against)
    Skipped,
    /// Dry run: would have downloaded
    WouldDownload,
    /// Dry run: would have skipped
    WouldSkip,
    /// Downloaded; `verified` when a digest was checked
    Downloaded { verified: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub filename: String,
    pub destination: PathBuf,
    pub action: SyncAction,
}

/// Sync options.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub force: bool,
    pub dry_run: bool,
}

/// Downloads manifest entries into a models directory.
#[derive(Debug, Clone)]
pub struct ModelSync {
    http: Client,
    base_url: String,
    models_dir: PathBuf,
}

impl ModelSync {
    pub fn new(models_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::with_base_url(models_dir, DRIVE_BASE_URL)
    }

    /// Point at another host serving `/uc?id=<file_id>`.
    pub fn with_base_url(
        models_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> StorageResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(30 * 60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models_dir: models_dir.into(),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Process every entry in order, stopping at the first failure.
    ///
    /// Every entry is validated before anything is downloaded.
    pub async fn sync(
        &self,
        manifest: &ModelManifest,
        options: &SyncOptions,
    ) -> StorageResult<Vec<SyncOutcome>> {
        for entry in &manifest.models {
            entry.validate()?;
        }

        let mut outcomes = Vec::with_capacity(manifest.models.len());
        for entry in &manifest.models {
            outcomes.push(self.sync_entry(entry, options).await?);
        }
        info!("Model sync complete ({} entries)", outcomes.len());
        Ok(outcomes)
    }

    async fn sync_entry(
        &self,
        entry: &ManifestEntry,
        options: &SyncOptions,
    ) -> StorageResult<SyncOutcome> {
        let filename = entry.filename().to_string();
        let destination = self.models_dir.join(&filename);
        let expected = entry.expected_hash();
        let needed = should_download(&destination, expected, options.force).await?;

        let outcome = |action| SyncOutcome {
            filename: filename.clone(),
            destination: destination.clone(),
            action,
        };

        if options.dry_run {
            let action = if needed {
                SyncAction::WouldDownload
            } else {
                SyncAction::WouldSkip
            };
            return Ok(outcome(action));
        }

        if !needed {
            info!("Skipping {}: already present and matches expected hash", filename);
            return Ok(outcome(SyncAction::Skipped));
        }

        if destination.exists() {
            fs::remove_file(&destination).await?;
        }

        info!("Downloading {} to {}", filename, destination.display());
        self.download(entry.file_id(), &destination).await?;

        let verified = match expected {
            Some(expected) => {
                let actual = compute_sha256(&destination).await?;
                if !actual.eq_ignore_ascii_case(expected) {
                    let _ = fs::remove_file(&destination).await;
                    return Err(StorageError::HashMismatch {
                        filename: filename.clone(),
                        expected: expected.to_string(),
                        actual,
                    });
                }
                info!("Verified SHA-256 for {}", filename);
                true
            }
            None => false,
        };

        Ok(outcome(SyncAction::Downloaded { verified }))
    }

    async fn fetch(&self, file_id: &str, confirm: bool) -> StorageResult<Response> {
        let url = format!("{}/uc", self.base_url);
        let mut query = vec![("id", file_id)];
        if confirm {
            query.push(("confirm", "t"));
        }

        let response = self.http.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::download_failed(format!(
                "{} returned {} for file {}",
                url,
                response.status(),
                file_id
            )));
        }
        Ok(response)
    }

    /// Download to `<destination>.part`, then rename into place.
    async fn download(&self, file_id: &str, destination: &Path) -> StorageResult<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut response = self.fetch(file_id, false).await?;
        if is_html(&response) {
            // Large files answer with a virus-scan interstitial first
            warn!("Drive returned an interstitial page for {}, confirming", file_id);
            response = self.fetch(file_id, true).await?;
            if is_html(&response) {
                return Err(StorageError::download_failed(format!(
                    "file {file_id} is not publicly downloadable"
                )));
            }
        }

        let partial = destination.with_extension("part");
        let mut file = File::create(&partial).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            let _ = fs::remove_file(&partial).await;
            return Err(StorageError::download_failed(format!("empty download for {file_id}")));
        }

        fs::rename(&partial, destination).await?;
        info!("Downloaded {} bytes to {}", written, destination.display());
        Ok(())
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HELLO_SHA: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn manifest(sha256: Option<&str>) -> ModelManifest {
        ModelManifest {
            models: vec![ManifestEntry {
                file_id: "abc".into(),
                filename: "model_0.9_acc_20_frames.safetensors".into(),
                sha256: sha256.map(str::to_string),
            }],
        }
    }

    async fn serve_hello() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uc"))
            .and(query_param("id", "abc"))
            .respond_with(octet(b"hello"))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_downloads_and_verifies() {
        let server = serve_hello().await;
        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();

        let outcomes = sync
            .sync(&manifest(Some(HELLO_SHA)), &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, SyncAction::Downloaded { verified: true });
        assert_eq!(std::fs::read(&outcomes[0].destination).unwrap(), b"hello");

        // Second run finds the file intact
        let outcomes = sync
            .sync(&manifest(Some(HELLO_SHA)), &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, SyncAction::Skipped);
    }

    fn octet(body: &[u8]) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/octet-stream")
            .set_body_bytes(body.to_vec())
    }

    fn interstitial() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_raw(b"<html>virus scan warning</html>".to_vec(), "text/html; charset=utf-8")
    }

    fn destination(dir: &TempDir) -> PathBuf {
        dir.path().join("model_0.9_acc_20_frames.safetensors")
    }

    #[tokio::test]
    async fn test_force_redownloads_intact_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uc"))
            .and(query_param("id", "abc"))
            .respond_with(octet(b"hello"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(destination(&dir), b"hello").unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();
        let options = SyncOptions {
            force: true,
            dry_run: false,
        };

        let outcomes = sync.sync(&manifest(Some(HELLO_SHA)), &options).await.unwrap();
        assert_eq!(outcomes[0].action, SyncAction::Downloaded { verified: true });
        assert_eq!(std::fs::read(destination(&dir)).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_stale_file_is_replaced() {
        let server = serve_hello().await;
        let dir = TempDir::new().unwrap();
        std::fs::write(destination(&dir), b"stale weights").unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();

        let outcomes = sync
            .sync(&manifest(Some(HELLO_SHA)), &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, SyncAction::Downloaded { verified: true });
        assert_eq!(std::fs::read(destination(&dir)).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_interstitial_is_confirmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uc"))
            .and(query_param("id", "abc"))
            .and(query_param("confirm", "t"))
            .respond_with(octet(b"hello"))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/uc"))
            .and(query_param("id", "abc"))
            .respond_with(interstitial())
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();
        let outcomes = sync
            .sync(&manifest(Some(HELLO_SHA)), &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(outcomes[0].action, SyncAction::Downloaded { verified: true });
        assert_eq!(std::fs::read(destination(&dir)).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_second_interstitial_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uc"))
            .respond_with(interstitial())
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();
        let err = sync.sync(&manifest(None), &SyncOptions::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::DownloadFailed(_)));
        assert!(!destination(&dir).exists());
        assert!(!destination(&dir).with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_error_status_is_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();
        let err = sync.sync(&manifest(None), &SyncOptions::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::DownloadFailed(_)));
        assert!(!destination(&dir).exists());
    }

    #[tokio::test]
    async fn test_hash_mismatch_removes_file() {
        let server = serve_hello().await;
        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), server.uri()).unwrap();

        let err = sync
            .sync(&manifest(Some("deadbeef")), &SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::HashMismatch { .. }));
        assert!(!dir.path().join("model_0.9_acc_20_frames.safetensors").exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), "http://127.0.0.1:9").unwrap();
        let options = SyncOptions {
            force: false,
            dry_run: true,
        };

        let outcomes = sync.sync(&manifest(None), &options).await.unwrap();
        assert_eq!(outcomes[0].action, SyncAction::WouldDownload);
        assert!(!outcomes[0].destination.exists());
    }

    #[tokio::test]
    async fn test_invalid_entry_stops_before_download() {
        let dir = TempDir::new().unwrap();
        let sync = ModelSync::with_base_url(dir.path(), "http://127.0.0.1:9").unwrap();
        let mut bad = manifest(None);
        bad.models.push(ManifestEntry {
            file_id: String::new(),
            filename: "x".into(),
            sha256: None,
        });

        let err = sync.sync(&bad, &SyncOptions::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidManifest(_)));
    }
}
