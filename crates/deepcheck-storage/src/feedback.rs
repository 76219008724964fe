//! User feedback log (`logs/feedback.jsonl`).

use std::path::{Path, PathBuf};

use deepcheck_models::FeedbackEntry;
use tracing::info;

use crate::error::StorageResult;
use crate::jsonl::append_json_line;

pub const FEEDBACK_FILE: &str = "feedback.jsonl";

/// Append-only feedback log.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(log_dir: &Path) -> Self {
        Self::new(log_dir.join(FEEDBACK_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &FeedbackEntry) -> StorageResult<()> {
        append_json_line(&self.path, entry).await?;
        info!(video = %entry.video, "Recorded feedback");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feedback_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = FeedbackLog::in_dir(dir.path());
        let entry = FeedbackEntry::new("a.mp4", "FAKE", Some(82.5), "looks right");
        log.append(&entry).await.unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let parsed: FeedbackEntry = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed, entry);
    }
}
