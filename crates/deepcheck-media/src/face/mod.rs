//! Face localization used by the frame pipeline.
//!
//! A locator answers "where is the face in this frame", nothing more. Misses
//! are `Ok(None)`; the pipeline treats both misses and errors as "use the full
//! frame".

mod yunet;

pub use yunet::{find_yunet_model, YuNetLocator, YUNET_MODEL_PATHS};

use opencv::core::{Mat, Rect};

use crate::error::MediaResult;

/// Axis-aligned face box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub score: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, score: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            score,
        }
    }

    /// Integer crop rectangle clamped to a `frame_width` x `frame_height` frame.
    ///
    /// `None` when nothing of the box lies inside the frame.
    pub fn clamp_to(&self, frame_width: i32, frame_height: i32) -> Option<Rect> {
        let left = (self.x.floor() as i32).clamp(0, frame_width);
        let top = (self.y.floor() as i32).clamp(0, frame_height);
        let right = ((self.x + self.width).ceil() as i32).clamp(0, frame_width);
        let bottom = ((self.y + self.height).ceil() as i32).clamp(0, frame_height);

        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Finds the face to crop in a frame.
pub trait FaceLocator: Send {
    /// First face in the frame, if any.
    fn locate(&mut self, frame: &Mat) -> MediaResult<Option<FaceBox>>;
}

/// Locator that never finds a face; the pipeline then uses full frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFaceLocator;

impl FaceLocator for NoFaceLocator {
    fn locate(&mut self, _frame: &Mat) -> MediaResult<Option<FaceBox>> {
        Ok(None)
    }
}

/// Production locator when a YuNet model is available, [`NoFaceLocator`] otherwise.
pub fn default_locator(model_override: Option<&std::path::Path>) -> Box<dyn FaceLocator> {
    match YuNetLocator::from_config(model_override) {
        Ok(locator) => Box::new(locator),
        Err(e) => {
            tracing::warn!("Face detection disabled, using full frames: {}", e);
            Box::new(NoFaceLocator)
        }
    }
}
