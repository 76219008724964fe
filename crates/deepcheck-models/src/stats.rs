//! Detection statistics derived from the audit log.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::record::round_to;

/// Confidence at or above which a verdict counts as high confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 80.0;

/// Aggregate counts over every logged verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionStats {
    pub total: u64,
    pub real: u64,
    pub fake: u64,
    /// Mean confidence, rounded to one decimal (0 when empty)
    pub avg_confidence: f64,
    pub high_confidence_count: u64,
}

/// Folds audit log lines into [`DetectionStats`].
///
/// Lines that are not JSON objects are skipped entirely. A parsed entry always
/// counts toward `total` and the verdict counts (anything other than `REAL` is
/// counted as fake); its confidence only contributes when it is numeric or a
/// numeric string, and a missing confidence counts as 0.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    stats: DetectionStats,
    confidence_sum: f64,
    confidence_count: u64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one raw log line.
    pub fn push_line(&mut self, line: &str) {
        let entry: serde_json::Value = match serde_json::from_str(line.trim()) {
            Ok(v) => v,
            Err(_) => return,
        };
        if !entry.is_object() {
            return;
        }

        self.stats.total += 1;
        if entry.get("verdict").and_then(|v| v.as_str()) == Some("REAL") {
            self.stats.real += 1;
        } else {
            self.stats.fake += 1;
        }

        let confidence = match entry.get("confidence") {
            None => Some(0.0),
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };

        if let Some(conf) = confidence {
            self.confidence_sum += conf;
            self.confidence_count += 1;
            if conf >= HIGH_CONFIDENCE_THRESHOLD {
                self.stats.high_confidence_count += 1;
            }
        }
    }

    pub fn finish(mut self) -> DetectionStats {
        if self.confidence_count > 0 {
            self.stats.avg_confidence =
                round_to(self.confidence_sum / self.confidence_count as f64, 1);
        }
        self.stats
    }
}

impl DetectionStats {
    /// Compute stats over an iterator of log lines.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut acc = StatsAccumulator::new();
        for line in lines {
            acc.push_line(line);
        }
        acc.finish()
    }
}
