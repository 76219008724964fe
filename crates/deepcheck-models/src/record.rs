//! Audit log records.

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::verdict::{AnalysisMode, Verdict};

/// Current UTC time as an ISO-8601 string with microseconds and a `Z` suffix.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Round to a fixed number of decimals.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// One analyzed video, as appended to the detections log.
///
/// Serialized as a single JSON object per line:
/// `{video, verdict, confidence, mode, model_path?, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerdictRecord {
    /// File name of the analyzed video
    pub video: String,

    /// Binary verdict
    pub verdict: Verdict,

    /// Confidence in the verdict, 0-100
    pub confidence: f64,

    /// Decision path that produced the verdict
    pub mode: AnalysisMode,

    /// Checkpoint file name (ml mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// ISO-8601 UTC timestamp
    pub timestamp: String,
}

impl VerdictRecord {
    /// Create a record stamped with the current time.
    ///
    /// Confidence is rounded to the precision of the mode (2 decimals for
    /// `ml`, 1 for `demo`).
    pub fn new(
        video: impl Into<String>,
        verdict: Verdict,
        confidence: f64,
        mode: AnalysisMode,
        model_path: Option<String>,
    ) -> Self {
        Self {
            video: video.into(),
            verdict,
            confidence: round_to(confidence, mode.confidence_decimals()),
            mode,
            model_path,
            timestamp: utc_timestamp(),
        }
    }

    /// Serialize as one newline-terminated JSON line.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn is_demo(&self) -> bool {
        self.mode == AnalysisMode::Demo
    }
}

/// User feedback on a verdict, appended to the feedback log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackEntry {
    pub video: String,
    pub verdict: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub feedback: String,
    pub timestamp: String,
}

impl FeedbackEntry {
    pub fn new(
        video: impl Into<String>,
        verdict: impl Into<String>,
        confidence: Option<f64>,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            video: video.into(),
            verdict: verdict.into(),
            confidence,
            feedback: feedback.into(),
            timestamp: utc_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_rounding_by_mode() {
        let ml = VerdictRecord::new("a.mp4", Verdict::Real, 97.12345, AnalysisMode::Ml, None);
        assert_eq!(ml.confidence, 97.12);

        let demo = VerdictRecord::new("a.mp4", Verdict::Fake, 83.46, AnalysisMode::Demo, None);
        assert_eq!(demo.confidence, 83.5);
    }

    #[test]
    fn test_json_line_shape() {
        let record = VerdictRecord::new(
            "uploaded_1.mp4",
            Verdict::Fake,
            91.0,
            AnalysisMode::Ml,
            Some("model_0.97_x_40.safetensors".to_string()),
        );
        let line = record.to_json_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["verdict"], "FAKE");
        assert_eq!(value["mode"], "ml");
        assert_eq!(value["model_path"], "model_0.97_x_40.safetensors");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_demo_record_omits_model_path() {
        let record = VerdictRecord::new("v.webm", Verdict::Real, 72.0, AnalysisMode::Demo, None);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("model_path").is_none());
        assert!(record.is_demo());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
