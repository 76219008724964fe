//! Per-frame resize and normalization.

use ndarray::Array3;
use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::{MatTraitConst, MatTraitConstManual};

use crate::error::{MediaError, MediaResult};

/// Side length frames are resized to.
pub const FRAME_SIZE: i32 = 112;

/// ImageNet channel means.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations.
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize to a square and normalize into a CHW `f32` tensor.
///
/// Channels keep the order they have in the input `Mat`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeTransform {
    pub size: i32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for NormalizeTransform {
    fn default() -> Self {
        Self {
            size: FRAME_SIZE,
            mean: CHANNEL_MEAN,
            std: CHANNEL_STD,
        }
    }
}

impl NormalizeTransform {
    /// Transform one 8-bit 3-channel image to `[3, size, size]`.
    pub fn apply(&self, image: &Mat) -> MediaResult<Array3<f32>> {
        if image.empty() {
            return Err(MediaError::invalid_input("empty frame"));
        }
        if image.channels() != 3 || image.depth() != opencv::core::CV_8U {
            return Err(MediaError::invalid_input(format!(
                "expected 8-bit 3-channel frame, got {} channels",
                image.channels()
            )));
        }

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(self.size, self.size),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let data = resized.data_typed::<u8>()?;
        let side = self.size as usize;
        let mut chw = Array3::<f32>::zeros((3, side, side));

        // HWC -> CHW
        for y in 0..side {
            for x in 0..side {
                let base = (y * side + x) * 3;
                for c in 0..3 {
                    let v = data[base + c] as f32 / 255.0;
                    chw[[c, y, x]] = (v - self.mean[c]) / self.std[c];
                }
            }
        }

        Ok(chw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1, CV_8UC3};

    fn solid(width: i32, height: i32, bgr: (f64, f64, f64)) -> Mat {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::new(bgr.0, bgr.1, bgr.2, 0.0))
            .unwrap()
    }

    #[test]
    fn test_output_shape_and_values() {
        let transform = NormalizeTransform::default();
        let out = transform.apply(&solid(64, 48, (255.0, 0.0, 51.0))).unwrap();
        assert_eq!(out.shape(), &[3, 112, 112]);

        // Channel 0 holds the first decoder channel
        let expected0 = (1.0 - CHANNEL_MEAN[0]) / CHANNEL_STD[0];
        let expected1 = (0.0 - CHANNEL_MEAN[1]) / CHANNEL_STD[1];
        let expected2 = (0.2 - CHANNEL_MEAN[2]) / CHANNEL_STD[2];
        assert!((out[[0, 50, 50]] - expected0).abs() < 1e-4);
        assert!((out[[1, 0, 111]] - expected1).abs() < 1e-4);
        assert!((out[[2, 111, 0]] - expected2).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_single_channel() {
        let gray = Mat::new_rows_cols_with_default(10, 10, CV_8UC1, Scalar::all(0.0)).unwrap();
        let err = NormalizeTransform::default().apply(&gray).unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(NormalizeTransform::default().apply(&Mat::default()).is_err());
    }
}
