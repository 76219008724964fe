//! Heuristic analyzer used when no trained model can run.
//!
//! Samples a handful of frames spread over the video, measures sharpness,
//! inter-frame motion and hue spread, and maps those statistics through a
//! fixed band table to a verdict. It also writes display images for every
//! sampled frame into a directory of their own per video, named after the
//! video's file stem.
//!
//! The analyzer never fails: any error inside it yields an authentic verdict
//! at 50% confidence together with whatever images were already written.

mod features;
mod scoring;
mod side_images;

pub use features::{hue_std, laplacian_variance, mean_abs_diff, HeuristicFeatures, SignalSamples};
pub use scoring::{
    decide, score, Accumulator, Band, Bound, ScoreCard, Statistic, BANDS, CONFIDENCE_CEILING,
    CONFIDENCE_FLOOR,
};
pub use side_images::{bordered_centre_crop, display_copy, write_side_images, SideImages};

use std::path::{Path, PathBuf};

use deepcheck_models::Verdict;
use tracing::{debug, info, warn};

use crate::error::MediaResult;
use crate::video::VideoReader;

/// Verdict reported when the heuristic cannot score a video.
pub const DEFAULT_VERDICT: Verdict = Verdict::Real;
pub const DEFAULT_CONFIDENCE: f64 = 50.0;

/// Result of a heuristic analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicOutcome {
    pub verdict: Verdict,
    pub confidence: f64,
    /// `None` when too few frames could be sampled to score
    pub features: Option<HeuristicFeatures>,
    pub side_images: SideImages,
}

impl HeuristicOutcome {
    fn safe_default(side_images: SideImages) -> Self {
        Self {
            verdict: DEFAULT_VERDICT,
            confidence: DEFAULT_CONFIDENCE,
            features: None,
            side_images,
        }
    }
}

/// Directory name for one video's side images.
///
/// The file stem with anything outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn side_image_dir_name(video_path: &Path) -> String {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "video".to_string()
    } else {
        name
    }
}

/// Frame-statistics analyzer.
#[derive(Debug, Clone)]
pub struct HeuristicAnalyzer {
    num_frames: usize,
    out_dir: PathBuf,
    url_prefix: String,
}

impl HeuristicAnalyzer {
    pub fn new(num_frames: usize, out_dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            num_frames: num_frames.max(1),
            out_dir: out_dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Analyze a video. Errors are logged and turned into the safe default.
    pub fn analyze(&self, video_path: &Path) -> HeuristicOutcome {
        let mut side_images = SideImages::default();
        match self.run(video_path, &mut side_images) {
            Ok(Some(features)) => {
                let card = score(&features);
                let (verdict, confidence) = decide(card, features.motion_std);
                info!(
                    fake_score = card.fake,
                    real_score = card.real,
                    "Heuristic verdict for {}: {} ({:.1}%)",
                    video_path.display(),
                    verdict,
                    confidence
                );
                HeuristicOutcome {
                    verdict,
                    confidence,
                    features: Some(features),
                    side_images,
                }
            }
            Ok(None) => {
                debug!(
                    "Too few frames to score {}, using default verdict",
                    video_path.display()
                );
                HeuristicOutcome::safe_default(side_images)
            }
            Err(e) => {
                warn!("Heuristic analysis of {} failed: {}", video_path.display(), e);
                HeuristicOutcome::safe_default(side_images)
            }
        }
    }

    /// Sample frames, write side images and aggregate the signals.
    fn run(&self, video_path: &Path, side_images: &mut SideImages) -> MediaResult<Option<HeuristicFeatures>> {
        let mut reader = VideoReader::open(video_path)?;

        // Images from an earlier run of the same video are replaced, not mixed in
        let dir_name = side_image_dir_name(video_path);
        let out_dir = self.out_dir.join(&dir_name);
        if out_dir.exists() {
            std::fs::remove_dir_all(&out_dir)?;
        }
        std::fs::create_dir_all(&out_dir)?;
        let url_prefix = format!("{}/{}", self.url_prefix.trim_end_matches('/'), dir_name);

        let total = reader.frame_count();
        let stride = (total / self.num_frames).max(1);
        let mut samples = SignalSamples::new();

        let mut sampled = 0usize;
        let mut index = 0usize;
        while sampled < self.num_frames && index < total {
            reader.seek(index)?;
            let Some(frame) = reader.read_next()? else {
                break;
            };

            samples.push_frame(&frame)?;
            let (frame_path, face_path) =
                write_side_images(&frame, sampled, &out_dir, &url_prefix)?;
            side_images.frames.push(frame_path);
            side_images.faces.push(face_path);

            sampled += 1;
            index += stride;
        }

        debug!(
            "Sampled {} of {} frames (stride {}) from {}",
            sampled,
            total,
            stride,
            video_path.display()
        );
        Ok(samples.features())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_video_yields_safe_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let analyzer = HeuristicAnalyzer::new(6, dir.path().join("demo"), "images/demo");
        let outcome = analyzer.analyze(Path::new("/no/such/video.mp4"));
        assert_eq!(outcome.verdict, Verdict::Real);
        assert_eq!(outcome.confidence, 50.0);
        assert!(outcome.features.is_none());
        assert!(outcome.side_images.is_empty());
    }

    #[test]
    fn test_garbage_video_yields_safe_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("broken.mp4");
        std::fs::write(&video, b"\x00\x01 not a real container").unwrap();

        let analyzer = HeuristicAnalyzer::new(6, dir.path().join("demo"), "images/demo");
        let outcome = analyzer.analyze(&video);
        assert_eq!((outcome.verdict, outcome.confidence), (Verdict::Real, 50.0));
    }

    #[test]
    fn test_side_image_dir_name() {
        assert_eq!(side_image_dir_name(Path::new("/up/uploaded_17_2.mp4")), "uploaded_17_2");
        assert_eq!(side_image_dir_name(Path::new("My Clip (1).webm")), "My_Clip__1_");
        assert_eq!(side_image_dir_name(Path::new("..")), "video");
    }

    #[test]
    fn test_zero_frames_clamped_to_one() {
        let analyzer = HeuristicAnalyzer::new(0, "out", "images/demo");
        assert_eq!(analyzer.num_frames(), 1);
    }
}
