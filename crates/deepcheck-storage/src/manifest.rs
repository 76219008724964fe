//! Model manifest (`model_manifest.json`).
//!
//! ```json
//! { "models": [ { "file_id": "...", "filename": "model_0.97_acc_40_frames.safetensors", "sha256": "..." } ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{StorageError, StorageResult};

const HASH_CHUNK: usize = 1024 * 1024;

/// One downloadable checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ManifestEntry {
    /// Both identifiers must be present and non-blank.
    pub fn validate(&self) -> StorageResult<()> {
        if self.file_id.trim().is_empty() {
            return Err(StorageError::invalid_manifest("Manifest 'file_id' cannot be empty."));
        }
        if self.filename.trim().is_empty() {
            return Err(StorageError::invalid_manifest("Manifest 'filename' cannot be empty."));
        }
        Ok(())
    }

    pub fn file_id(&self) -> &str {
        self.file_id.trim()
    }

    pub fn filename(&self) -> &str {
        self.filename.trim()
    }

    /// Expected digest, `None` when absent or blank.
    pub fn expected_hash(&self) -> Option<&str> {
        self.sha256.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default)]
    pub models: Vec<ManifestEntry>,
}

impl ModelManifest {
    pub fn from_json(text: &str) -> StorageResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value.get("models") {
            None => Ok(Self::default()),
            Some(models) if models.is_array() => Ok(serde_json::from_value(value)?),
            Some(_) => Err(StorageError::invalid_manifest(
                "Manifest 'models' key must contain a list.",
            )),
        }
    }

    pub async fn load(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            return Err(StorageError::ManifestNotFound(path.to_path_buf()));
        }
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }
}

/// Lowercase hex SHA-256 of a file, read in 1 MiB chunks.
pub async fn compute_sha256(path: &Path) -> StorageResult<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Whether `target` needs (re)downloading.
///
/// Forced, missing, or present with a digest that differs from the expected
/// one (case-insensitive). A present file with no expected digest is kept.
pub async fn should_download(
    target: &Path,
    expected_hash: Option<&str>,
    force: bool,
) -> StorageResult<bool> {
    if force || !target.exists() {
        return Ok(true);
    }
    let Some(expected) = expected_hash else {
        return Ok(false);
    };
    let actual = compute_sha256(target).await?;
    Ok(!actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello")
    const HELLO_SHA: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_parse_manifest() {
        let manifest = ModelManifest::from_json(
            r#"{"models": [{"file_id": " abc ", "filename": "m.safetensors", "sha256": ""}]}"#,
        )
        .unwrap();
        let entry = &manifest.models[0];
        entry.validate().unwrap();
        assert_eq!(entry.file_id(), "abc");
        assert_eq!(entry.expected_hash(), None);
    }

    #[test]
    fn test_missing_models_key_is_empty() {
        assert!(ModelManifest::from_json("{}").unwrap().models.is_empty());
    }

    #[test]
    fn test_models_must_be_list() {
        let err = ModelManifest::from_json(r#"{"models": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, StorageError::InvalidManifest(_)));
    }

    #[test]
    fn test_blank_identifiers_rejected() {
        let entry = ManifestEntry {
            file_id: "  ".into(),
            filename: "m.safetensors".into(),
            sha256: None,
        };
        assert!(entry.validate().is_err());

        let entry = ManifestEntry {
            file_id: "abc".into(),
            filename: String::new(),
            sha256: None,
        };
        assert!(entry.validate().is_err());
    }

    #[tokio::test]
    async fn test_should_download() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("m.safetensors");

        assert!(should_download(&target, None, false).await.unwrap());

        std::fs::write(&target, b"hello").unwrap();
        assert_eq!(compute_sha256(&target).await.unwrap(), HELLO_SHA);
        assert!(!should_download(&target, None, false).await.unwrap());
        assert!(!should_download(&target, Some(&HELLO_SHA.to_uppercase()), false).await.unwrap());
        assert!(should_download(&target, Some("deadbeef"), false).await.unwrap());
        assert!(should_download(&target, Some(HELLO_SHA), true).await.unwrap());
    }
}
