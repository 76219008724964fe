//! Deepcheck decision engine.
//!
//! This crate turns a video file into an authenticity verdict:
//! - Checkpoint selection by window size and validation accuracy
//! - Frame extraction with optional YuNet face cropping
//! - Spatial trunk (ONNX Runtime) plus LSTM and linear head (ndarray)
//! - Heuristic fallback driven by frame statistics
//!
//! [`select_analyzer`] picks one of the two paths at startup.

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod face;
pub mod heuristic;
pub mod inference;
pub mod pipeline;
pub mod result;
pub mod video;

pub use checkpoint::{Checkpoint, CheckpointSelector};
pub use config::{Device, EngineConfig, ModePreference, TemporalConfig};
pub use engine::{
    ml_unavailable_reason, select_analyzer, AnalysisOutcome, AuthenticityAnalyzer,
    ExtractorLoader, HeuristicFallback, MlAnalyzer,
};
pub use error::{MediaError, MediaResult};
pub use face::{FaceBox, FaceLocator, NoFaceLocator, YuNetLocator};
pub use heuristic::{HeuristicAnalyzer, HeuristicOutcome, SideImages};
pub use inference::{InferenceEngine, InferenceResult, SpatialFeatureExtractor, TemporalWeights};
pub use pipeline::{FramePipeline, FrameSequence, NormalizeTransform};
pub use video::{FrameSource, VideoReader};
