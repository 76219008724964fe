//! Video decoding via OpenCV `VideoCapture`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use opencv::core::Mat;
use opencv::prelude::{MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{self, VideoCapture, CAP_PROP_FRAME_COUNT, CAP_PROP_POS_FRAMES};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Sequential source of decoded BGR frames.
pub trait FrameSource {
    /// Next frame, or `None` at the end of the stream.
    fn next_frame(&mut self) -> MediaResult<Option<Mat>>;
}

/// An opened video file.
pub struct VideoReader {
    cap: VideoCapture,
    path: PathBuf,
}

impl VideoReader {
    /// Open a video file.
    ///
    /// Fails with `FileNotFound` when the path does not exist and with
    /// `DecodeFailure` when no backend can open it.
    pub fn open(path: &Path) -> MediaResult<Self> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::invalid_input(format!("non UTF-8 path: {}", path.display())))?;

        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .map_err(|e| MediaError::decode_failure(format!("Failed to open video: {e}")))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::decode_failure(format!(
                "Failed to open video file: {}",
                path.display()
            )));
        }

        debug!("Opened video {}", path.display());
        Ok(Self {
            cap,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frame count reported by the container (may be 0 or approximate).
    pub fn frame_count(&self) -> usize {
        self.cap
            .get(CAP_PROP_FRAME_COUNT)
            .ok()
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    /// Position the decoder at a frame index.
    ///
    /// Returns whether the backend accepted the request; some backends report
    /// `false` and seek anyway, so callers detect failure on the next read.
    pub fn seek(&mut self, frame_index: usize) -> MediaResult<bool> {
        let accepted = self.cap.set(CAP_PROP_POS_FRAMES, frame_index as f64)?;
        if !accepted {
            debug!("Backend rejected seek to frame {}", frame_index);
        }
        Ok(accepted)
    }

    /// Decode the next frame.
    pub fn read_next(&mut self) -> MediaResult<Option<Mat>> {
        let mut frame = Mat::default();
        let grabbed = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::decode_failure(format!("Failed to read frame: {e}")))?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl FrameSource for VideoReader {
    fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
        self.read_next()
    }
}

/// Frames held in memory, yielded in order.
#[derive(Default)]
pub struct MatQueue {
    frames: VecDeque<Mat>,
}

impl MatQueue {
    pub fn new(frames: impl IntoIterator<Item = Mat>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MatQueue {
    fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let err = VideoReader::open(Path::new("/definitely/not/here.mp4"))
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_open_garbage_file_is_decode_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"this is not a video container").unwrap();
        let err = VideoReader::open(&path).err().unwrap();
        assert!(matches!(err, MediaError::DecodeFailure(_)));
    }

    #[test]
    fn test_mat_queue_order() {
        let frames = vec![Mat::default(), Mat::default()];
        let mut queue = MatQueue::new(frames);
        assert!(queue.next_frame().unwrap().is_some());
        assert!(queue.next_frame().unwrap().is_some());
        assert!(queue.next_frame().unwrap().is_none());
    }
}
