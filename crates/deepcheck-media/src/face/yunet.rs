//! OpenCV YuNet face locator.
//!
//! YuNet is a small CNN face detector exposed through OpenCV's
//! `FaceDetectorYN`. The model file is looked up in the configured location
//! first, then in a list of standard install paths.

use std::path::{Path, PathBuf};

use opencv::core::{Mat, Ptr, Size};
use opencv::imgproc;
use opencv::objdetect::FaceDetectorYN;
use opencv::prelude::{FaceDetectorYNTrait, MatTraitConst};
use tracing::{debug, info, warn};

use super::{FaceBox, FaceLocator};
use crate::error::{MediaError, MediaResult};

/// Standard YuNet model locations, in preference order.
///
/// The 2023mar models need OpenCV 4.8+; the 2022mar model is the fallback for
/// older builds.
pub const YUNET_MODEL_PATHS: &[&str] = &[
    "models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "models/face_detection/yunet/face_detection_yunet_2023mar_int8.onnx",
    "models/face_detection/yunet/face_detection_yunet_2022mar.onnx",
    "/app/models/face_detection/yunet/face_detection_yunet_2023mar.onnx",
    "/app/models/face_detection/yunet/face_detection_yunet_2022mar.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2023mar.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2022mar.onnx",
];

/// Score threshold for a detection to count as a face.
const SCORE_THRESHOLD: f32 = 0.6;

/// NMS threshold
const NMS_THRESHOLD: f32 = 0.3;

/// Top K candidates kept before NMS
const TOP_K: i32 = 20;

/// Model files smaller than this are treated as truncated downloads.
const MIN_MODEL_BYTES: u64 = 50_000;

/// Resolve the YuNet model: explicit override, then the standard paths.
pub fn find_yunet_model(model_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = model_override {
        return path.exists().then(|| path.to_path_buf());
    }
    YUNET_MODEL_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// YuNet-backed [`FaceLocator`].
///
/// The detector's input size follows the frame size; it is recreated lazily
/// whenever a frame with different dimensions arrives.
pub struct YuNetLocator {
    model_path: PathBuf,
    detector: Option<Ptr<FaceDetectorYN>>,
    input_size: (i32, i32),
}

impl YuNetLocator {
    /// Create a locator for a specific model file.
    pub fn new(model_path: impl Into<PathBuf>) -> MediaResult<Self> {
        let model_path = model_path.into();
        let metadata = std::fs::metadata(&model_path).map_err(|e| {
            MediaError::detection_failed(format!(
                "Cannot read YuNet model file {}: {}",
                model_path.display(),
                e
            ))
        })?;
        if metadata.len() < MIN_MODEL_BYTES {
            return Err(MediaError::detection_failed(format!(
                "YuNet model file appears corrupted (size: {} bytes)",
                metadata.len()
            )));
        }

        info!("YuNet face locator using {}", model_path.display());
        Ok(Self {
            model_path,
            detector: None,
            input_size: (0, 0),
        })
    }

    /// Create a locator from the configured override or the standard paths.
    pub fn from_config(model_override: Option<&Path>) -> MediaResult<Self> {
        let path = find_yunet_model(model_override)
            .ok_or_else(|| MediaError::detection_failed("No YuNet model found"))?;
        Self::new(path)
    }

    /// Detector input size for a frame: scaled into 640x480, rounded to a
    /// multiple of 32.
    fn calculate_input_size(frame_width: i32, frame_height: i32) -> (i32, i32) {
        let scale = (frame_width as f64 / 640.0)
            .max(frame_height as f64 / 480.0)
            .max(1.0);

        const ALIGNMENT: i32 = 32;
        let align = |v: f64| {
            let v = v.round() as i32;
            (((v + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT).max(ALIGNMENT)
        };

        (
            align(frame_width as f64 / scale),
            align(frame_height as f64 / scale),
        )
    }

    fn detector_for(&mut self, input_size: (i32, i32)) -> MediaResult<&mut Ptr<FaceDetectorYN>> {
        use opencv::dnn::{DNN_BACKEND_DEFAULT, DNN_TARGET_CPU};

        if self.detector.is_none() || self.input_size != input_size {
            let model = self.model_path.to_string_lossy();
            let detector = FaceDetectorYN::create(
                &model,
                "",
                Size::new(input_size.0, input_size.1),
                SCORE_THRESHOLD,
                NMS_THRESHOLD,
                TOP_K,
                DNN_BACKEND_DEFAULT,
                DNN_TARGET_CPU,
            )
            .map_err(|e| MediaError::detection_failed(format!("Failed to create YuNet detector: {e}")))?;
            debug!("YuNet detector created for input {}x{}", input_size.0, input_size.1);
            self.detector = Some(detector);
            self.input_size = input_size;
        }

        self.detector
            .as_mut()
            .ok_or_else(|| MediaError::internal("YuNet detector missing"))
    }
}

impl FaceLocator for YuNetLocator {
    fn locate(&mut self, frame: &Mat) -> MediaResult<Option<FaceBox>> {
        if frame.empty() {
            return Ok(None);
        }
        let (frame_width, frame_height) = (frame.cols(), frame.rows());
        let input_size = Self::calculate_input_size(frame_width, frame_height);

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(input_size.0, input_size.1),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let detector = self.detector_for(input_size)?;
        let mut faces = Mat::default();
        detector
            .detect(&resized, &mut faces)
            .map_err(|e| MediaError::detection_failed(format!("YuNet detection failed: {e}")))?;

        parse_first_face(&faces, frame_width, frame_height, input_size)
    }
}

/// Highest-scoring face in YuNet output, mapped back to frame coordinates.
///
/// Rows are `[x, y, w, h, 5 landmark pairs, score]`.
fn parse_first_face(
    faces: &Mat,
    frame_width: i32,
    frame_height: i32,
    input_size: (i32, i32),
) -> MediaResult<Option<FaceBox>> {
    if faces.rows() <= 0 {
        return Ok(None);
    }
    if faces.cols() < 15 {
        warn!("YuNet output has unexpected format: {} columns (expected 15)", faces.cols());
        return Ok(None);
    }

    let scale_x = frame_width as f64 / input_size.0 as f64;
    let scale_y = frame_height as f64 / input_size.1 as f64;

    let mut best: Option<FaceBox> = None;
    for i in 0..faces.rows() {
        let x = *faces.at_2d::<f32>(i, 0)? as f64 * scale_x;
        let y = *faces.at_2d::<f32>(i, 1)? as f64 * scale_y;
        let w = *faces.at_2d::<f32>(i, 2)? as f64 * scale_x;
        let h = *faces.at_2d::<f32>(i, 3)? as f64 * scale_y;
        let score = *faces.at_2d::<f32>(i, 14)? as f64;

        if w <= 0.0 || h <= 0.0 || score < SCORE_THRESHOLD as f64 {
            continue;
        }
        if best.map_or(true, |b| score > b.score) {
            best = Some(FaceBox::new(x, y, w, h, score));
        }
    }

    Ok(best)
}
