//! Checkpoint discovery.
//!
//! Trained checkpoints live flat in one directory and encode their metadata in
//! the file name: `<tag>_<accuracy>_<ignored>_<sequence_length>.<ext>`.
//! Selection re-scans the directory on every call.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// A checkpoint file with the metadata parsed from its name.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub accuracy: f64,
    pub sequence_length: u32,
}

impl Checkpoint {
    /// Base file name, used as `model_path` in verdict records.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Parse `(accuracy, sequence_length)` from a checkpoint file stem.
///
/// Returns `None` when the stem has fewer than four `_`-separated fields, when
/// field 1 is not a finite float, or when field 3 is not an unsigned integer.
pub fn parse_checkpoint_name(stem: &str) -> Option<(f64, u32)> {
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 4 {
        return None;
    }
    let accuracy: f64 = parts[1].parse().ok()?;
    if !accuracy.is_finite() {
        return None;
    }
    let sequence_length: u32 = parts[3].parse().ok()?;
    Some((accuracy, sequence_length))
}

/// Picks the most accurate checkpoint trained for a given window size.
#[derive(Debug, Clone)]
pub struct CheckpointSelector {
    dir: PathBuf,
    extension: String,
}

impl CheckpointSelector {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List every well-formed checkpoint in the directory.
    pub fn scan(&self) -> MediaResult<Vec<Checkpoint>> {
        let entries = std::fs::read_dir(&self.dir)?;
        let mut found = Vec::new();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match parse_checkpoint_name(stem) {
                Some((accuracy, sequence_length)) => found.push(Checkpoint {
                    path,
                    accuracy,
                    sequence_length,
                }),
                None => debug!("Skipping checkpoint with unparseable name: {}", path.display()),
            }
        }

        Ok(found)
    }

    /// Select the checkpoint with the highest accuracy for `sequence_length`.
    ///
    /// Equal accuracies resolve to the lexicographically greatest file name.
    pub fn select(&self, sequence_length: u32) -> MediaResult<Checkpoint> {
        if !self.dir.is_dir() {
            return Err(MediaError::no_matching_model(
                sequence_length,
                format!("checkpoint directory missing: {}", self.dir.display()),
            ));
        }

        let best = self
            .scan()?
            .into_iter()
            .filter(|c| c.sequence_length == sequence_length)
            .max_by(|a, b| {
                a.accuracy
                    .partial_cmp(&b.accuracy)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
            })
            .ok_or_else(|| {
                MediaError::no_matching_model(
                    sequence_length,
                    format!("no checkpoint in {} encodes this window", self.dir.display()),
                )
            })?;

        info!(
            "Selected checkpoint {} (accuracy={}, sequence_length={})",
            best.file_name(),
            best.accuracy,
            best.sequence_length
        );
        Ok(best)
    }
}
