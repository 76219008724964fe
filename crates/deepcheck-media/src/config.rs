//! Process-wide engine configuration.
//!
//! Built once at startup and handed to the analyzers by reference. Nothing in
//! the engine reads the environment after this point.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{MediaError, MediaResult};
use crate::pipeline::NormalizeTransform;

/// Execution device for the spatial feature extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    /// CUDA execution provider (requires the `cuda` feature; falls back to CPU)
    Cuda,
}

impl FromStr for Device {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(MediaError::invalid_input(format!("unknown device: {other}"))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Which analyzer the capability check may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModePreference {
    /// Trained model when available, heuristic analyzer otherwise
    #[default]
    Auto,
    /// Trained model only; startup fails when it is unavailable
    Ml,
    /// Heuristic analyzer only
    Demo,
}

impl FromStr for ModePreference {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(ModePreference::Auto),
            "ml" => Ok(ModePreference::Ml),
            "demo" | "heuristic" => Ok(ModePreference::Demo),
            other => Err(MediaError::invalid_input(format!("unknown analysis mode: {other}"))),
        }
    }
}

/// Shape of the temporal aggregator and classifier a checkpoint must match.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalConfig {
    /// Length of the per-frame feature vector produced by the backbone
    pub latent_dim: usize,
    /// LSTM hidden size
    pub hidden_dim: usize,
    /// Number of stacked LSTM layers
    pub layers: usize,
    pub bidirectional: bool,
    /// Number of output classes
    pub num_classes: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            latent_dim: 2048,
            hidden_dim: 2048,
            layers: 1,
            bidirectional: false,
            num_classes: 2,
        }
    }
}

impl TemporalConfig {
    pub fn directions(&self) -> usize {
        if self.bidirectional {
            2
        } else {
            1
        }
    }

    /// Input width of the classifier.
    pub fn classifier_in(&self) -> usize {
        self.hidden_dim * self.directions()
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory scanned for trained checkpoints
    pub models_dir: PathBuf,
    /// File extension of checkpoint files (without the dot)
    pub checkpoint_extension: String,
    /// Shared ONNX spatial backbone
    pub backbone_model_path: PathBuf,
    /// YuNet model override; standard locations are searched when unset
    pub face_model_path: Option<PathBuf>,
    /// Output directory for heuristic side images
    pub demo_dir: PathBuf,
    /// Relative URL prefix reported for side images
    pub demo_url_prefix: String,
    /// Frames sampled by the heuristic analyzer
    pub demo_sample_frames: usize,
    pub mode: ModePreference,
    pub device: Device,
    pub temporal: TemporalConfig,
    pub transform: NormalizeTransform,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            checkpoint_extension: "safetensors".to_string(),
            backbone_model_path: PathBuf::from("models/backbone/resnext50_trunk.onnx"),
            face_model_path: None,
            demo_dir: PathBuf::from("static/images/demo"),
            demo_url_prefix: "images/demo".to_string(),
            demo_sample_frames: 6,
            mode: ModePreference::Auto,
            device: Device::Cpu,
            temporal: TemporalConfig::default(),
            transform: NormalizeTransform::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    ///
    /// An `ANALYSIS_MODE` or `DEVICE` value that does not parse is an error.
    pub fn from_env() -> MediaResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> MediaResult<Self> {
        let defaults = Self::default();
        let temporal_defaults = TemporalConfig::default();

        let parse_or = |name: &str, default: usize| -> usize {
            var(name).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
        };
        let non_blank = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let mode = match non_blank("ANALYSIS_MODE") {
            Some(v) => v.parse::<ModePreference>().map_err(|e| {
                MediaError::invalid_input(format!("ANALYSIS_MODE must be auto, ml or demo ({e})"))
            })?,
            None => defaults.mode,
        };
        let device = match non_blank("DEVICE") {
            Some(v) => v
                .parse::<Device>()
                .map_err(|e| MediaError::invalid_input(format!("DEVICE must be cpu or cuda ({e})")))?,
            None => defaults.device,
        };

        Ok(Self {
            models_dir: var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            checkpoint_extension: var("CHECKPOINT_EXTENSION")
                .map(|s| s.trim_start_matches('.').to_string())
                .unwrap_or(defaults.checkpoint_extension),
            backbone_model_path: var("BACKBONE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.backbone_model_path),
            face_model_path: var("FACE_MODEL_PATH").map(PathBuf::from),
            demo_dir: var("DEMO_DIR").map(PathBuf::from).unwrap_or(defaults.demo_dir),
            demo_url_prefix: var("DEMO_URL_PREFIX").unwrap_or(defaults.demo_url_prefix),
            demo_sample_frames: parse_or("DEMO_SAMPLE_FRAMES", defaults.demo_sample_frames).max(1),
            mode,
            device,
            temporal: TemporalConfig {
                latent_dim: parse_or("LATENT_DIM", temporal_defaults.latent_dim),
                hidden_dim: parse_or("LSTM_HIDDEN_DIM", temporal_defaults.hidden_dim),
                layers: parse_or("LSTM_LAYERS", temporal_defaults.layers).max(1),
                bidirectional: var("LSTM_BIDIRECTIONAL")
                    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
                ..temporal_defaults
            },
            transform: NormalizeTransform::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_architecture() {
        let config = EngineConfig::default();
        assert_eq!(config.temporal.latent_dim, 2048);
        assert_eq!(config.temporal.hidden_dim, 2048);
        assert_eq!(config.temporal.layers, 1);
        assert!(!config.temporal.bidirectional);
        assert_eq!(config.temporal.classifier_in(), 2048);
        assert_eq!(config.demo_sample_frames, 6);
        assert_eq!(config.transform.size, 112);
    }

    #[test]
    fn test_parse_device_and_mode() {
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda);
        assert!("tpu".parse::<Device>().is_err());
        assert_eq!("demo".parse::<ModePreference>().unwrap(), ModePreference::Demo);
        assert_eq!("".parse::<ModePreference>().unwrap(), ModePreference::Auto);
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("ANALYSIS_MODE", "ML"),
            ("DEVICE", "cuda"),
            ("MODELS_DIR", "/srv/models"),
            ("LSTM_LAYERS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.mode, ModePreference::Ml);
        assert_eq!(config.device, Device::Cuda);
        assert_eq!(config.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.temporal.layers, 1);
    }

    #[test]
    fn test_unset_or_blank_mode_is_auto() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mode, ModePreference::Auto);
        let config = EngineConfig::from_lookup(lookup(&[("ANALYSIS_MODE", "  ")])).unwrap();
        assert_eq!(config.mode, ModePreference::Auto);
    }

    #[test]
    fn test_mistyped_mode_is_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("ANALYSIS_MODE", "mll")])).unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
        assert!(err.to_string().contains("ANALYSIS_MODE"));

        let err = EngineConfig::from_lookup(lookup(&[("DEVICE", "tpu")])).unwrap_err();
        assert!(err.to_string().contains("DEVICE"));
    }

    #[test]
    fn test_bidirectional_doubles_classifier_input() {
        let temporal = TemporalConfig {
            hidden_dim: 16,
            bidirectional: true,
            ..TemporalConfig::default()
        };
        assert_eq!(temporal.classifier_in(), 32);
    }
}
