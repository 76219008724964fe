//! Checkpoint parameters for the temporal head.
//!
//! A checkpoint is a safetensors archive. Keys under `model.` belong to the
//! spatial trunk and are ignored here; everything else must match the
//! configured architecture exactly.

use std::collections::HashSet;
use std::path::Path;

use half::{bf16, f16};
use ndarray::{Array1, Array2};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use tracing::debug;

use crate::config::TemporalConfig;
use crate::error::{MediaError, MediaResult};

/// Prefix of spatial trunk parameters.
const TRUNK_PREFIX: &str = "model.";

/// Weights for one LSTM layer in one direction.
///
/// Gate rows are stacked in the order input, forget, cell, output.
#[derive(Debug, Clone)]
pub struct LstmDirectionWeights {
    /// `[4 * hidden, input]`
    pub w_ih: Array2<f32>,
    /// `[4 * hidden, hidden]`
    pub w_hh: Array2<f32>,
    /// `b_ih + b_hh`, `[4 * hidden]`; `None` for bias-free checkpoints
    pub bias: Option<Array1<f32>>,
}

/// Weights of the temporal aggregator and classifier.
#[derive(Debug, Clone)]
pub struct TemporalWeights {
    /// Indexed by `[layer][direction]`
    pub lstm: Vec<Vec<LstmDirectionWeights>>,
    /// `[classes, hidden * directions]`
    pub linear_weight: Array2<f32>,
    /// `[classes]`
    pub linear_bias: Array1<f32>,
}

fn suffix(direction: usize) -> &'static str {
    if direction == 0 {
        ""
    } else {
        "_reverse"
    }
}

/// Decode a tensor's raw little-endian bytes to `f32`.
fn to_f32_vec(name: &str, view: &TensorView<'_>) -> MediaResult<Vec<f32>> {
    let data = view.data();
    let values = match view.dtype() {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        other => {
            return Err(MediaError::model_load(format!(
                "{name}: unsupported dtype {other:?}"
            )))
        }
    };
    Ok(values)
}

struct Archive<'data> {
    tensors: SafeTensors<'data>,
    consumed: HashSet<String>,
}

impl<'data> Archive<'data> {
    fn has(&self, name: &str) -> bool {
        self.tensors.tensor(name).is_ok()
    }

    fn matrix(&mut self, name: &str, rows: usize, cols: usize) -> MediaResult<Array2<f32>> {
        let view = self
            .tensors
            .tensor(name)
            .map_err(|_| MediaError::model_load(format!("missing parameter {name}")))?;
        if view.shape() != [rows, cols] {
            return Err(MediaError::model_load(format!(
                "{name}: expected shape [{rows}, {cols}], found {:?}",
                view.shape()
            )));
        }
        let values = to_f32_vec(name, &view)?;
        self.consumed.insert(name.to_string());
        Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| MediaError::model_load(format!("{name}: {e}")))
    }

    fn vector(&mut self, name: &str, len: usize) -> MediaResult<Array1<f32>> {
        let view = self
            .tensors
            .tensor(name)
            .map_err(|_| MediaError::model_load(format!("missing parameter {name}")))?;
        if view.shape() != [len] {
            return Err(MediaError::model_load(format!(
                "{name}: expected shape [{len}], found {:?}",
                view.shape()
            )));
        }
        let values = to_f32_vec(name, &view)?;
        self.consumed.insert(name.to_string());
        Ok(Array1::from_vec(values))
    }
}

impl TemporalWeights {
    /// Read and validate a checkpoint file.
    pub fn load(path: &Path, config: &TemporalConfig) -> MediaResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            MediaError::model_load(format!("cannot read checkpoint {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes, config)
    }

    /// Parse and validate a serialized safetensors archive.
    pub fn from_bytes(bytes: &[u8], config: &TemporalConfig) -> MediaResult<Self> {
        let tensors = SafeTensors::deserialize(bytes)
            .map_err(|e| MediaError::model_load(format!("invalid checkpoint archive: {e}")))?;
        let mut archive = Archive {
            tensors,
            consumed: HashSet::new(),
        };

        let hidden = config.hidden_dim;
        let gates = 4 * hidden;
        let directions = config.directions();

        let mut lstm = Vec::with_capacity(config.layers);
        for layer in 0..config.layers {
            let input = if layer == 0 {
                config.latent_dim
            } else {
                hidden * directions
            };
            let mut per_direction = Vec::with_capacity(directions);
            for direction in 0..directions {
                let sfx = suffix(direction);
                let w_ih = archive.matrix(&format!("lstm.weight_ih_l{layer}{sfx}"), gates, input)?;
                let w_hh = archive.matrix(&format!("lstm.weight_hh_l{layer}{sfx}"), gates, hidden)?;

                let b_ih_name = format!("lstm.bias_ih_l{layer}{sfx}");
                let b_hh_name = format!("lstm.bias_hh_l{layer}{sfx}");
                let bias = match (archive.has(&b_ih_name), archive.has(&b_hh_name)) {
                    (true, true) => {
                        let b_ih = archive.vector(&b_ih_name, gates)?;
                        let b_hh = archive.vector(&b_hh_name, gates)?;
                        Some(b_ih + b_hh)
                    }
                    (false, false) => None,
                    _ => {
                        return Err(MediaError::model_load(format!(
                            "layer {layer}{sfx}: bias_ih and bias_hh must be present together"
                        )))
                    }
                };

                per_direction.push(LstmDirectionWeights { w_ih, w_hh, bias });
            }
            lstm.push(per_direction);
        }

        let linear_weight =
            archive.matrix("linear1.weight", config.num_classes, config.classifier_in())?;
        let linear_bias = archive.vector("linear1.bias", config.num_classes)?;

        let mut unexpected: Vec<String> = archive
            .tensors
            .names()
            .into_iter()
            .filter(|name| !name.starts_with(TRUNK_PREFIX) && !archive.consumed.contains(*name))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            unexpected.sort();
            return Err(MediaError::model_load(format!(
                "unexpected parameters in checkpoint: {}",
                unexpected.join(", ")
            )));
        }

        debug!(
            "Loaded temporal head: {} layer(s), {} direction(s), hidden={}",
            config.layers, directions, hidden
        );

        Ok(Self {
            lstm,
            linear_weight,
            linear_bias,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use safetensors::tensor::{Dtype, TensorView};

    /// Build a safetensors archive from `(name, shape, values)` triples as f32.
    pub fn archive(entries: &[(&str, Vec<usize>, Vec<f32>)]) -> Vec<u8> {
        let raw: BTreeMap<String, (Vec<usize>, Vec<u8>)> = entries
            .iter()
            .map(|(name, shape, values)| {
                let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
                (name.to_string(), (shape.clone(), bytes))
            })
            .collect();

        let views: Vec<(String, TensorView<'_>)> = raw
            .iter()
            .map(|(name, (shape, bytes))| {
                (
                    name.clone(),
                    TensorView::new(Dtype::F32, shape.clone(), bytes).unwrap(),
                )
            })
            .collect();

        safetensors::serialize(views, &None).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::archive;
    use super::*;

    fn small_config() -> TemporalConfig {
        TemporalConfig {
            latent_dim: 3,
            hidden_dim: 2,
            layers: 1,
            bidirectional: false,
            num_classes: 2,
        }
    }

    fn valid_entries() -> Vec<(&'static str, Vec<usize>, Vec<f32>)> {
        vec![
            ("lstm.weight_ih_l0", vec![8, 3], vec![0.1; 24]),
            ("lstm.weight_hh_l0", vec![8, 2], vec![0.2; 16]),
            ("linear1.weight", vec![2, 2], vec![1.0, 0.0, 0.0, 1.0]),
            ("linear1.bias", vec![2], vec![0.0, 0.5]),
        ]
    }

    #[test]
    fn test_loads_bias_free_checkpoint() {
        let bytes = archive(&valid_entries());
        let weights = TemporalWeights::from_bytes(&bytes, &small_config()).unwrap();
        assert_eq!(weights.lstm.len(), 1);
        assert_eq!(weights.lstm[0].len(), 1);
        assert!(weights.lstm[0][0].bias.is_none());
        assert_eq!(weights.lstm[0][0].w_ih.shape(), &[8, 3]);
        assert_eq!(weights.linear_bias[1], 0.5);
    }

    #[test]
    fn test_bias_pair_is_summed() {
        let mut entries = valid_entries();
        entries.push(("lstm.bias_ih_l0", vec![8], vec![1.0; 8]));
        entries.push(("lstm.bias_hh_l0", vec![8], vec![0.5; 8]));
        let weights = TemporalWeights::from_bytes(&archive(&entries), &small_config()).unwrap();
        let bias = weights.lstm[0][0].bias.as_ref().unwrap();
        assert!(bias.iter().all(|b| (*b - 1.5).abs() < 1e-6));
    }

    #[test]
    fn test_trunk_parameters_are_ignored() {
        let mut entries = valid_entries();
        entries.push(("model.0.conv1.weight", vec![2], vec![0.0, 0.0]));
        assert!(TemporalWeights::from_bytes(&archive(&entries), &small_config()).is_ok());
    }

    #[test]
    fn test_missing_classifier_is_model_load() {
        let entries: Vec<_> = valid_entries()
            .into_iter()
            .filter(|(name, _, _)| *name != "linear1.weight")
            .collect();
        let err = TemporalWeights::from_bytes(&archive(&entries), &small_config()).unwrap_err();
        assert!(matches!(err, MediaError::ModelLoad(ref m) if m.contains("linear1.weight")));
    }

    #[test]
    fn test_unexpected_key_is_model_load() {
        let mut entries = valid_entries();
        entries.push(("linear2.weight", vec![2], vec![0.0, 0.0]));
        let err = TemporalWeights::from_bytes(&archive(&entries), &small_config()).unwrap_err();
        assert!(matches!(err, MediaError::ModelLoad(ref m) if m.contains("linear2.weight")));
    }

    #[test]
    fn test_shape_mismatch_is_model_load() {
        let config = TemporalConfig {
            latent_dim: 4,
            ..small_config()
        };
        let err = TemporalWeights::from_bytes(&archive(&valid_entries()), &config).unwrap_err();
        assert!(matches!(err, MediaError::ModelLoad(ref m) if m.contains("weight_ih_l0")));
    }

    #[test]
    fn test_half_bias_pair_rejected() {
        let mut entries = valid_entries();
        entries.push(("lstm.bias_ih_l0", vec![8], vec![1.0; 8]));
        assert!(TemporalWeights::from_bytes(&archive(&entries), &small_config()).is_err());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = TemporalWeights::from_bytes(b"not an archive", &small_config()).unwrap_err();
        assert!(matches!(err, MediaError::ModelLoad(_)));
    }
}
