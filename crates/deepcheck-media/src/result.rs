//! Verdict record construction.

use std::path::Path;

use deepcheck_models::{AnalysisMode, VerdictRecord};

use crate::checkpoint::Checkpoint;
use crate::heuristic::HeuristicOutcome;
use crate::inference::InferenceResult;

fn video_name(video_path: &Path) -> String {
    video_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| video_path.to_string_lossy().into_owned())
}

/// Record for a trained-model verdict.
pub fn record_from_inference(
    video_path: &Path,
    result: &InferenceResult,
    checkpoint: &Checkpoint,
) -> VerdictRecord {
    VerdictRecord::new(
        video_name(video_path),
        result.verdict(),
        result.confidence,
        AnalysisMode::Ml,
        Some(checkpoint.file_name()),
    )
}

/// Record for a heuristic verdict.
pub fn record_from_heuristic(video_path: &Path, outcome: &HeuristicOutcome) -> VerdictRecord {
    VerdictRecord::new(
        video_name(video_path),
        outcome.verdict,
        outcome.confidence,
        AnalysisMode::Demo,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::SideImages;
    use deepcheck_models::Verdict;
    use std::path::PathBuf;

    #[test]
    fn test_ml_record() {
        let result = InferenceResult {
            predicted_class: 1,
            confidence: 91.23456,
            probabilities: vec![0.0876544, 0.9123456],
        };
        let checkpoint = Checkpoint {
            path: PathBuf::from("/models/model_0.97_x_40.safetensors"),
            accuracy: 0.97,
            sequence_length: 40,
        };
        let record = record_from_inference(Path::new("/uploads/uploaded_1.mp4"), &result, &checkpoint);
        assert_eq!(record.video, "uploaded_1.mp4");
        assert_eq!(record.verdict, Verdict::Real);
        assert_eq!(record.confidence, 91.23);
        assert_eq!(record.mode, AnalysisMode::Ml);
        assert_eq!(record.model_path.as_deref(), Some("model_0.97_x_40.safetensors"));
        assert!(record.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_demo_record() {
        let outcome = HeuristicOutcome {
            verdict: Verdict::Fake,
            confidence: 83.0,
            features: None,
            side_images: SideImages::default(),
        };
        let record = record_from_heuristic(Path::new("clip.webm"), &outcome);
        assert_eq!(record.video, "clip.webm");
        assert_eq!(record.confidence, 83.0);
        assert_eq!(record.mode, AnalysisMode::Demo);
        assert!(record.model_path.is_none());
    }
}
