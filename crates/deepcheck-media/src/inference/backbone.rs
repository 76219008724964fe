//! Spatial feature extraction.
//!
//! The production extractor runs a frozen convolutional trunk exported to
//! ONNX. Whatever the graph returns is reduced to one feature vector per frame.

use ndarray::{Array2, Array4};

use crate::error::{MediaError, MediaResult};

/// Maps a batch of normalized frames `[T, 3, H, W]` to features `[T, C]`.
pub trait SpatialFeatureExtractor: Send + Sync {
    fn extract(&self, frames: &Array4<f32>) -> MediaResult<Array2<f32>>;
}

/// Reduce a raw trunk output to `[T, C]`.
///
/// Accepts `[T, C, h, w]` (adaptive average pooling to 1x1), `[T, C, 1, 1]`
/// and `[T, C]`.
pub fn pool_features(shape: &[usize], data: &[f32]) -> MediaResult<Array2<f32>> {
    let expected: usize = shape.iter().product();
    if data.len() != expected {
        return Err(MediaError::model_load(format!(
            "backbone output has {} values for shape {:?}",
            data.len(),
            shape
        )));
    }

    match *shape {
        [t, c] => Array2::from_shape_vec((t, c), data.to_vec())
            .map_err(|e| MediaError::model_load(format!("backbone output: {e}"))),
        [t, c, h, w] if h > 0 && w > 0 => {
            let area = h * w;
            let pooled: Vec<f32> = data
                .chunks_exact(area)
                .map(|plane| plane.iter().sum::<f32>() / area as f32)
                .collect();
            Array2::from_shape_vec((t, c), pooled)
                .map_err(|e| MediaError::model_load(format!("backbone output: {e}")))
        }
        _ => Err(MediaError::model_load(format!(
            "unsupported backbone output shape {shape:?}"
        ))),
    }
}

#[cfg(feature = "ml")]
pub use self::onnx::OrtBackbone;

#[cfg(feature = "ml")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ndarray::{Array2, Array4};
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::{Tensor, Value};
    use tracing::info;

    use super::{pool_features, SpatialFeatureExtractor};
    use crate::config::Device;
    use crate::error::{MediaError, MediaResult};

    /// ONNX Runtime backed trunk.
    pub struct OrtBackbone {
        session: Mutex<Session>,
        output_name: String,
    }

    impl OrtBackbone {
        pub fn load(model_path: &Path, device: Device) -> MediaResult<Self> {
            if !model_path.exists() {
                return Err(MediaError::model_load(format!(
                    "backbone model not found at {}",
                    model_path.display()
                )));
            }
            let model_bytes = std::fs::read(model_path)
                .map_err(|e| MediaError::model_load(format!("ORT read model file: {e}")))?;

            let session = create_session(&model_bytes, device)?;
            let output_name = session
                .outputs
                .first()
                .map(|o| o.name.clone())
                .ok_or_else(|| MediaError::model_load("backbone graph has no outputs"))?;

            info!(
                "Loaded backbone {} (output '{}')",
                model_path.display(),
                output_name
            );
            Ok(Self {
                session: Mutex::new(session),
                output_name,
            })
        }
    }

    fn create_session(model_bytes: &[u8], device: Device) -> MediaResult<Session> {
        let builder = Session::builder()
            .map_err(|e| MediaError::model_load(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::model_load(format!("ORT opt level: {e}")))?;

        #[cfg(all(target_os = "linux", feature = "cuda"))]
        {
            use ort::execution_providers::CUDAExecutionProvider;
            if device == Device::Cuda {
                if let Ok(cuda_builder) = builder
                    .clone()
                    .with_execution_providers([CUDAExecutionProvider::default().build()])
                {
                    if let Ok(session) = cuda_builder.commit_from_memory(model_bytes) {
                        info!("Using CUDA execution provider for backbone");
                        return Ok(session);
                    }
                }
                tracing::warn!("CUDA execution provider not available, using CPU");
            }
        }

        #[cfg(not(all(target_os = "linux", feature = "cuda")))]
        {
            if device == Device::Cuda {
                tracing::warn!("Built without CUDA support, using CPU");
            }
        }

        builder
            .commit_from_memory(model_bytes)
            .map_err(|e| MediaError::model_load(format!("ORT load model: {e}")))
    }

    impl SpatialFeatureExtractor for OrtBackbone {
        fn extract(&self, frames: &Array4<f32>) -> MediaResult<Array2<f32>> {
            let shape = frames.shape().to_vec();
            let data: Vec<f32> = frames.iter().copied().collect();
            let input = Tensor::from_array((shape, data.into_boxed_slice()))
                .map(Value::from)
                .map_err(|e| MediaError::internal(format!("ORT tensor: {e}")))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| MediaError::internal("ORT session poisoned"))?;
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| MediaError::internal(format!("ORT run failed: {e}")))?;
            let output = outputs
                .get(self.output_name.as_str())
                .ok_or_else(|| MediaError::internal("ORT returned no outputs"))?;

            let (out_shape, out_data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| MediaError::internal(format!("ORT extract: {e}")))?;
            let dims: Vec<usize> = out_shape.iter().map(|d| (*d).max(0) as usize).collect();
            pool_features(&dims, out_data)
        }
    }

    /// Whether ONNX Runtime can be initialized in this process.
    pub fn runtime_available() -> bool {
        match Session::builder() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("ONNX Runtime unavailable: {}", e);
                false
            }
        }
    }
}

#[cfg(feature = "ml")]
pub use self::onnx::runtime_available;

/// Whether ONNX Runtime can be initialized in this process.
#[cfg(not(feature = "ml"))]
pub fn runtime_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_feature_map() {
        // T=1, C=2, 2x2 planes
        let data = [1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 10.0, 10.0];
        let pooled = pool_features(&[1, 2, 2, 2], &data).unwrap();
        assert_eq!(pooled.shape(), &[1, 2]);
        assert!((pooled[[0, 0]] - 2.5).abs() < 1e-6);
        assert!((pooled[[0, 1]] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_pooled_and_flat_outputs_pass_through() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let a = pool_features(&[2, 3, 1, 1], &data).unwrap();
        let b = pool_features(&[2, 3], &data).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[[1, 2]], 6.0);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(pool_features(&[2, 3, 4], &[0.0; 24]).is_err());
        assert!(pool_features(&[2, 3], &[0.0; 5]).is_err());
    }
}
