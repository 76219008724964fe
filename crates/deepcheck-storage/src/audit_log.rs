//! Append-only verdict log (`logs/detections.jsonl`).

use std::path::{Path, PathBuf};

use deepcheck_models::{DetectionStats, VerdictRecord};
use tracing::{debug, info};

use crate::error::StorageResult;
use crate::jsonl::{append_json_line, read_to_string_if_exists};

/// File name of the verdict log inside the log directory.
pub const DETECTIONS_FILE: &str = "detections.jsonl";

/// Verdict audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log stored as `<log_dir>/detections.jsonl`.
    pub fn in_dir(log_dir: &Path) -> Self {
        Self::new(log_dir.join(DETECTIONS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record.
    pub async fn append(&self, record: &VerdictRecord) -> StorageResult<()> {
        append_json_line(&self.path, record).await?;
        info!(
            video = %record.video,
            verdict = %record.verdict,
            mode = record.mode.as_str(),
            "Recorded verdict"
        );
        Ok(())
    }

    /// Statistics over every line; all zeros when the log does not exist.
    pub async fn stats(&self) -> StorageResult<DetectionStats> {
        let text = read_to_string_if_exists(&self.path).await?.unwrap_or_default();
        Ok(DetectionStats::from_lines(text.lines()))
    }

    /// Most recent well-formed record for `video`.
    pub async fn latest_for(&self, video: &str) -> StorageResult<Option<VerdictRecord>> {
        let Some(text) = read_to_string_if_exists(&self.path).await? else {
            return Ok(None);
        };

        let latest = text
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str::<VerdictRecord>(line.trim()).ok())
            .find(|record| record.video == video);

        if latest.is_none() {
            debug!("No verdict recorded for {}", video);
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepcheck_models::{AnalysisMode, Verdict};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::in_dir(&dir.path().join("nested/logs"));
        let record = VerdictRecord::new("a.mp4", Verdict::Fake, 88.0, AnalysisMode::Ml, None);

        log.append(&record).await.unwrap();
        log.append(&record).await.unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_stats_on_missing_log() {
        let dir = TempDir::new().unwrap();
        let stats = AuditLog::in_dir(dir.path()).stats().await.unwrap();
        assert_eq!(stats, DetectionStats::default());
    }

    #[tokio::test]
    async fn test_stats_skip_garbage_lines() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::in_dir(dir.path());
        log.append(&VerdictRecord::new("a.mp4", Verdict::Real, 90.0, AnalysisMode::Ml, None))
            .await
            .unwrap();
        log.append(&VerdictRecord::new("b.mp4", Verdict::Fake, 70.0, AnalysisMode::Demo, None))
            .await
            .unwrap();
        tokio::fs::write(
            log.path(),
            format!(
                "{}not json\n",
                tokio::fs::read_to_string(log.path()).await.unwrap()
            ),
        )
        .await
        .unwrap();

        let stats = log.stats().await.unwrap();
        assert_eq!((stats.total, stats.real, stats.fake), (2, 1, 1));
        assert_eq!(stats.avg_confidence, 80.0);
        assert_eq!(stats.high_confidence_count, 1);
    }

    #[tokio::test]
    async fn test_latest_for_returns_newest_match() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::in_dir(dir.path());
        log.append(&VerdictRecord::new("a.mp4", Verdict::Real, 60.0, AnalysisMode::Ml, None))
            .await
            .unwrap();
        log.append(&VerdictRecord::new("b.mp4", Verdict::Real, 61.0, AnalysisMode::Ml, None))
            .await
            .unwrap();
        log.append(&VerdictRecord::new("a.mp4", Verdict::Fake, 77.0, AnalysisMode::Ml, None))
            .await
            .unwrap();

        let latest = log.latest_for("a.mp4").await.unwrap().unwrap();
        assert_eq!(latest.verdict, Verdict::Fake);
        assert!(log.latest_for("c.mp4").await.unwrap().is_none());
    }
}
