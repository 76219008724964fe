//! Frame pipeline: decode, crop to the face, normalize.
//!
//! Frames are read sequentially from the start of the video. Each frame is
//! cropped to the first located face (or kept whole when none is found) and
//! transformed into a normalized CHW tensor. Extraction stops once the window
//! is full; a short video is an error, never padded.

mod transform;

pub use transform::{NormalizeTransform, CHANNEL_MEAN, CHANNEL_STD, FRAME_SIZE};

use std::path::Path;

use ndarray::{s, Array4};
use opencv::core::Mat;
use opencv::prelude::MatTraitConst;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::face::FaceLocator;
use crate::video::{FrameSource, VideoReader};

/// A window of normalized frames, shape `[T, 3, size, size]`.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Array4<f32>,
}

impl FrameSequence {
    /// Wrap an already normalized `[T, 3, H, W]` tensor.
    pub fn from_array(frames: Array4<f32>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frames(&self) -> &Array4<f32> {
        &self.frames
    }

    pub fn into_inner(self) -> Array4<f32> {
        self.frames
    }
}

/// Builds [`FrameSequence`]s from videos.
pub struct FramePipeline<'a> {
    transform: &'a NormalizeTransform,
    locator: &'a mut dyn FaceLocator,
}

impl<'a> FramePipeline<'a> {
    pub fn new(transform: &'a NormalizeTransform, locator: &'a mut dyn FaceLocator) -> Self {
        Self { transform, locator }
    }

    /// Extract exactly `sequence_length` frames from a video file.
    pub fn extract(&mut self, video_path: &Path, sequence_length: usize) -> MediaResult<FrameSequence> {
        let mut reader = VideoReader::open(video_path)?;
        let sequence = self.extract_from(&mut reader, sequence_length)?;
        info!(
            "Extracted {} frames from {}",
            sequence.len(),
            video_path.display()
        );
        Ok(sequence)
    }

    /// Extract exactly `sequence_length` frames from any frame source.
    pub fn extract_from(
        &mut self,
        source: &mut dyn FrameSource,
        sequence_length: usize,
    ) -> MediaResult<FrameSequence> {
        if sequence_length == 0 {
            return Err(MediaError::invalid_input("sequence length must be positive"));
        }

        let side = self.transform.size as usize;
        let mut frames = Array4::<f32>::zeros((sequence_length, 3, side, side));
        let mut filled = 0usize;

        while filled < sequence_length {
            let Some(frame) = source.next_frame()? else {
                break;
            };
            let region = self.face_region(&frame)?;
            let tensor = self.transform.apply(&region)?;
            frames.slice_mut(s![filled, .., .., ..]).assign(&tensor);
            filled += 1;
        }

        if filled < sequence_length {
            return Err(MediaError::InsufficientFrames {
                required: sequence_length,
                available: filled,
            });
        }

        Ok(FrameSequence { frames })
    }

    /// Face crop of a frame, or the whole frame when no face is found.
    fn face_region(&mut self, frame: &Mat) -> MediaResult<Mat> {
        let located = match self.locator.locate(frame) {
            Ok(found) => found,
            Err(e) => {
                debug!("Face locator failed, using full frame: {}", e);
                None
            }
        };

        let rect = located.and_then(|b| b.clamp_to(frame.cols(), frame.rows()));
        match rect {
            Some(rect) => Ok(Mat::roi(frame, rect)?.try_clone()?),
            None => Ok(frame.try_clone()?),
        }
    }
}
