//! Newline-delimited JSON files.

use std::path::Path;

use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::StorageResult;

/// Append one value as a JSON line, creating parent directories.
///
/// The whole line goes out in a single `write_all` on a file opened in append
/// mode, so concurrent appenders never interleave within a line.
pub async fn append_json_line<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut line = serde_json::to_string(value)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Read the whole file, or `None` when it does not exist yet.
pub async fn read_to_string_if_exists(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
