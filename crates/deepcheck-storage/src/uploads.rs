//! Uploaded video storage.

use std::path::{Path, PathBuf};

use chrono::Utc;
use deepcheck_models::{is_allowed_video_file, numbered_upload_name};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Same-second uploads tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Directory holding uploaded videos.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store an upload as `uploaded_<unix seconds>.<ext>` and return its path.
    ///
    /// Only the extension of `original_name` is checked. An existing file is
    /// never overwritten: later uploads in the same second get
    /// `uploaded_<unix seconds>_<n>.<ext>`.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        self.store_at(original_name, bytes, Utc::now().timestamp()).await
    }

    pub async fn store_at(
        &self,
        original_name: &str,
        bytes: &[u8],
        unix_seconds: i64,
    ) -> StorageResult<PathBuf> {
        if !is_allowed_video_file(original_name) {
            return Err(StorageError::invalid_upload(format!(
                "unsupported video type: {original_name}"
            )));
        }
        if bytes.is_empty() {
            return Err(StorageError::invalid_upload("empty upload"));
        }

        fs::create_dir_all(&self.dir).await?;

        for n in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .dir
                .join(numbered_upload_name(original_name, unix_seconds, n));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("Upload name {} taken", path.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(bytes).await?;
            file.flush().await?;

            info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
            return Ok(path);
        }

        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free upload name for second {unix_seconds}"),
        )))
    }
}
