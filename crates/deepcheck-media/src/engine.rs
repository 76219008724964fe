//! Dual-path analysis: trained model or heuristic fallback.
//!
//! The path is chosen once at startup by [`select_analyzer`] and shared for
//! the lifetime of the process. Each call to
//! [`AuthenticityAnalyzer::analyze`] runs to completion on the calling thread
//! and rebuilds whatever it needs; nothing is cached between calls.

use std::path::Path;
use std::time::Instant;

use deepcheck_models::{AnalysisMode, VerdictRecord};
use metrics::{counter, histogram};
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointSelector;
use crate::config::{EngineConfig, ModePreference};
use crate::error::{MediaError, MediaResult};
use crate::face;
use crate::heuristic::{HeuristicAnalyzer, SideImages};
use crate::inference::{runtime_available, InferenceEngine, SpatialFeatureExtractor};
use crate::pipeline::FramePipeline;
use crate::result::{record_from_heuristic, record_from_inference};

/// Metric names.
pub mod names {
    pub const ANALYSES_TOTAL: &str = "deepcheck_analyses_total";
    pub const ANALYSIS_FAILURES_TOTAL: &str = "deepcheck_analysis_failures_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "deepcheck_analysis_duration_seconds";
}

/// What an analysis produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub record: VerdictRecord,
    /// Display images (heuristic path only)
    pub side_images: SideImages,
}

/// A decision path.
pub trait AuthenticityAnalyzer: Send + Sync {
    fn mode(&self) -> AnalysisMode;

    /// Analyze one video. `sequence_length` is the window size the caller
    /// asked for; the heuristic path ignores it.
    fn analyze(&self, video: &Path, sequence_length: u32) -> MediaResult<AnalysisOutcome>;
}

fn observe(mode: AnalysisMode, started: Instant, result: &MediaResult<AnalysisOutcome>) {
    let elapsed = started.elapsed().as_secs_f64();
    match result {
        Ok(outcome) => {
            let labels = [
                ("mode", mode.as_str().to_string()),
                ("verdict", outcome.record.verdict.as_str().to_string()),
            ];
            counter!(names::ANALYSES_TOTAL, &labels).increment(1);
            histogram!(names::ANALYSIS_DURATION_SECONDS, "mode" => mode.as_str()).record(elapsed);
        }
        Err(e) => {
            let kind = if e.is_user_error() { "user" } else { "internal" };
            let labels = [("mode", mode.as_str().to_string()), ("kind", kind.to_string())];
            counter!(names::ANALYSIS_FAILURES_TOTAL, &labels).increment(1);
        }
    }
}

/// Loads the spatial trunk for a checkpoint path.
pub type ExtractorLoader =
    Box<dyn Fn(&Path) -> MediaResult<Box<dyn SpatialFeatureExtractor>> + Send + Sync>;

/// Trained-model path: selector, frame pipeline, inference, decision.
pub struct MlAnalyzer {
    config: EngineConfig,
    selector: CheckpointSelector,
    loader: ExtractorLoader,
}

impl MlAnalyzer {
    /// Analyzer whose trunk runs on ONNX Runtime.
    #[cfg(feature = "ml")]
    pub fn new(config: EngineConfig) -> Self {
        let trunk_config = config.clone();
        let loader: ExtractorLoader = Box::new(move |checkpoint: &Path| {
            crate::inference::load_backbone(checkpoint, &trunk_config)
        });
        Self::with_extractor_loader(config, loader)
    }

    /// Analyzer with a custom trunk loader.
    pub fn with_extractor_loader(config: EngineConfig, loader: ExtractorLoader) -> Self {
        let selector = CheckpointSelector::new(&config.models_dir, &config.checkpoint_extension);
        Self {
            config,
            selector,
            loader,
        }
    }

    fn run(&self, video: &Path, sequence_length: u32) -> MediaResult<AnalysisOutcome> {
        if sequence_length == 0 {
            return Err(MediaError::invalid_input("sequence length must be positive"));
        }

        let checkpoint = self.selector.select(sequence_length)?;

        let mut locator = face::default_locator(self.config.face_model_path.as_deref());
        let mut pipeline = FramePipeline::new(&self.config.transform, locator.as_mut());
        let frames = pipeline.extract(video, sequence_length as usize)?;

        let extractor = (self.loader)(&checkpoint.path)?;
        let engine = InferenceEngine::new(extractor, self.config.temporal.clone());
        let result = engine.infer(&checkpoint.path, &frames)?;

        let record = record_from_inference(video, &result, &checkpoint);
        info!(
            "ML verdict for {}: {} ({:.2}%) using {}",
            record.video,
            record.verdict,
            record.confidence,
            checkpoint.file_name()
        );
        Ok(AnalysisOutcome {
            record,
            side_images: SideImages::default(),
        })
    }
}

impl AuthenticityAnalyzer for MlAnalyzer {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Ml
    }

    fn analyze(&self, video: &Path, sequence_length: u32) -> MediaResult<AnalysisOutcome> {
        let started = Instant::now();
        let result = self.run(video, sequence_length);
        if let Err(e) = &result {
            if e.is_user_error() {
                warn!("Analysis of {} rejected: {}", video.display(), e);
            } else {
                error!("Analysis of {} failed: {}", video.display(), e);
            }
        }
        observe(AnalysisMode::Ml, started, &result);
        result
    }
}

/// Heuristic path.
pub struct HeuristicFallback {
    analyzer: HeuristicAnalyzer,
}

impl HeuristicFallback {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            analyzer: HeuristicAnalyzer::new(
                config.demo_sample_frames,
                config.demo_dir.clone(),
                config.demo_url_prefix.clone(),
            ),
        }
    }
}

impl AuthenticityAnalyzer for HeuristicFallback {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Demo
    }

    fn analyze(&self, video: &Path, _sequence_length: u32) -> MediaResult<AnalysisOutcome> {
        let started = Instant::now();
        let outcome = self.analyzer.analyze(video);
        let result = Ok(AnalysisOutcome {
            record: record_from_heuristic(video, &outcome),
            side_images: outcome.side_images,
        });
        observe(AnalysisMode::Demo, started, &result);
        result
    }
}

/// Why the trained-model path cannot run, if it cannot.
pub fn ml_unavailable_reason(config: &EngineConfig) -> Option<String> {
    if !cfg!(feature = "ml") {
        return Some("built without the `ml` feature".to_string());
    }
    if !runtime_available() {
        return Some("ONNX Runtime failed to initialize".to_string());
    }
    if !config.backbone_model_path.is_file() {
        return Some(format!(
            "backbone model missing at {}",
            config.backbone_model_path.display()
        ));
    }
    None
}

/// Pick the decision path for this process.
///
/// A forced `ml` preference whose capability check fails is an error; `auto`
/// falls back to the heuristic path with a warning.
pub fn select_analyzer(config: &EngineConfig) -> MediaResult<Box<dyn AuthenticityAnalyzer>> {
    if config.mode == ModePreference::Demo {
        info!("Analysis mode forced to demo");
        return Ok(Box::new(HeuristicFallback::new(config)));
    }

    match ml_unavailable_reason(config) {
        None => build_ml(config),
        Some(reason) if config.mode == ModePreference::Ml => Err(MediaError::Unavailable(format!(
            "ml mode requested but {reason}"
        ))),
        Some(reason) => {
            warn!("Trained model unavailable ({}), using heuristic analysis", reason);
            Ok(Box::new(HeuristicFallback::new(config)))
        }
    }
}

#[cfg(feature = "ml")]
fn build_ml(config: &EngineConfig) -> MediaResult<Box<dyn AuthenticityAnalyzer>> {
    info!(
        "Using trained model path (checkpoints in {}, backbone {})",
        config.models_dir.display(),
        config.backbone_model_path.display()
    );
    Ok(Box::new(MlAnalyzer::new(config.clone())))
}

#[cfg(not(feature = "ml"))]
fn build_ml(_config: &EngineConfig) -> MediaResult<Box<dyn AuthenticityAnalyzer>> {
    Err(MediaError::Unavailable("built without the `ml` feature".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path) -> EngineConfig {
        EngineConfig {
            models_dir: dir.join("models"),
            backbone_model_path: dir.join("models/backbone/missing.onnx"),
            demo_dir: dir.join("demo"),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_demo_preference_selects_heuristic() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = EngineConfig {
            mode: ModePreference::Demo,
            ..config(dir.path())
        };
        assert_eq!(select_analyzer(&cfg).unwrap().mode(), AnalysisMode::Demo);
    }

    #[test]
    fn test_auto_without_backbone_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = config(dir.path());
        assert!(ml_unavailable_reason(&cfg).is_some());
        assert_eq!(select_analyzer(&cfg).unwrap().mode(), AnalysisMode::Demo);
    }

    #[test]
    fn test_forced_ml_without_backbone_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = EngineConfig {
            mode: ModePreference::Ml,
            ..config(dir.path())
        };
        assert!(matches!(select_analyzer(&cfg), Err(MediaError::Unavailable(_))));
    }

    #[test]
    fn test_heuristic_path_never_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let fallback = HeuristicFallback::new(&config(dir.path()));
        let outcome = fallback.analyze(&dir.path().join("missing.mp4"), 40).unwrap();
        assert_eq!(outcome.record.mode, AnalysisMode::Demo);
        assert_eq!(outcome.record.confidence, 50.0);
        assert_eq!(outcome.record.video, "missing.mp4");
    }

    #[test]
    fn test_ml_path_reports_missing_checkpoint() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        let loader: ExtractorLoader =
            Box::new(|_| Err(MediaError::model_load("no trunk in tests")));
        let analyzer = MlAnalyzer::with_extractor_loader(config(dir.path()), loader);

        let err = analyzer.analyze(&dir.path().join("clip.mp4"), 20).unwrap_err();
        assert!(matches!(err, MediaError::NoMatchingModel { sequence_length: 20, .. }));
        assert!(err.is_user_error());
    }
}
