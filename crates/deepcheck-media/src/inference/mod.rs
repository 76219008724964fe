//! Trained-model inference.
//!
//! Three stages run over one [`FrameSequence`]:
//!
//! 1. A frozen spatial trunk maps every frame to a feature vector, all frames
//!    in one batch.
//! 2. An LSTM consumes the per-frame features in order; only the last step's
//!    output is kept.
//! 3. `linear1` projects that output to two logits, which the decision layer
//!    turns into a class and a confidence.
//!
//! Checkpoints hold stages 2 and 3. The trunk comes from a sibling
//! `<stem>.onnx` file when the checkpoint ships one, else from the shared
//! backbone configured for the process.

mod backbone;
mod classifier;
mod decision;
mod lstm;
mod weights;

pub use backbone::{pool_features, runtime_available, SpatialFeatureExtractor};
#[cfg(feature = "ml")]
pub use backbone::OrtBackbone;
pub use classifier::Classifier;
pub use decision::{decide, softmax, InferenceResult};
pub use lstm::last_step_output;
pub use weights::{LstmDirectionWeights, TemporalWeights};

#[cfg(test)]
pub(crate) use weights::test_support;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::TemporalConfig;
use crate::error::{MediaError, MediaResult};
use crate::pipeline::FrameSequence;

/// Trunk to use for a checkpoint: `<stem>.onnx` next to it, else `shared`.
pub fn backbone_path_for(checkpoint: &Path, shared: &Path) -> PathBuf {
    let sibling = checkpoint.with_extension("onnx");
    if sibling != checkpoint && sibling.is_file() {
        sibling
    } else {
        shared.to_path_buf()
    }
}

/// Load the ONNX trunk that belongs to `checkpoint`.
#[cfg(feature = "ml")]
pub fn load_backbone(
    checkpoint: &Path,
    config: &crate::config::EngineConfig,
) -> MediaResult<Box<dyn SpatialFeatureExtractor>> {
    let trunk = backbone_path_for(checkpoint, &config.backbone_model_path);
    debug!("Loading spatial trunk {}", trunk.display());
    Ok(Box::new(OrtBackbone::load(&trunk, config.device)?))
}

/// Runs a checkpoint over a frame sequence.
pub struct InferenceEngine {
    extractor: Box<dyn SpatialFeatureExtractor>,
    temporal: TemporalConfig,
}

impl InferenceEngine {
    pub fn new(extractor: Box<dyn SpatialFeatureExtractor>, temporal: TemporalConfig) -> Self {
        Self {
            extractor,
            temporal,
        }
    }

    /// Load the checkpoint parameters and classify the sequence.
    pub fn infer(&self, checkpoint: &Path, frames: &FrameSequence) -> MediaResult<InferenceResult> {
        let weights = TemporalWeights::load(checkpoint, &self.temporal)?;
        self.infer_with(&weights, frames)
    }

    /// Classify with already loaded parameters.
    pub fn infer_with(
        &self,
        weights: &TemporalWeights,
        frames: &FrameSequence,
    ) -> MediaResult<InferenceResult> {
        let features = self.extractor.extract(frames.frames())?;
        if features.nrows() != frames.len() {
            return Err(MediaError::model_load(format!(
                "backbone returned {} feature rows for {} frames",
                features.nrows(),
                frames.len()
            )));
        }
        if features.ncols() != self.temporal.latent_dim {
            return Err(MediaError::model_load(format!(
                "backbone latent size {} does not match LSTM input {}",
                features.ncols(),
                self.temporal.latent_dim
            )));
        }

        let summary = last_step_output(features.view(), &weights.lstm)?;
        let classifier = Classifier::new(weights.linear_weight.clone(), weights.linear_bias.clone());
        let logits = classifier.logits(&summary)?;
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(MediaError::model_load(format!("non-finite logits {logits:?}")));
        }

        debug!("Logits: {:?}", logits);
        Ok(decide(&logits))
    }
}
