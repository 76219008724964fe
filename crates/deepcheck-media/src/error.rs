//! Error types for the decision engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while analyzing a video.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No matching model found for sequence length {sequence_length}: {reason}")]
    NoMatchingModel { sequence_length: u32, reason: String },

    #[error("Video has {available} usable frames, {required} required")]
    InsufficientFrames { required: usize, available: usize },

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Video decode failed: {0}")]
    DecodeFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a no-matching-model error.
    pub fn no_matching_model(sequence_length: u32, reason: impl Into<String>) -> Self {
        Self::NoMatchingModel {
            sequence_length,
            reason: reason.into(),
        }
    }

    /// Create a model load error.
    pub fn model_load(message: impl Into<String>) -> Self {
        Self::ModelLoad(message.into())
    }

    /// Create a decode failure error.
    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self::DecodeFailure(message.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Errors the caller can fix by changing the request (window size, video).
    ///
    /// Everything else is a server-side fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MediaError::NoMatchingModel { .. }
                | MediaError::InsufficientFrames { .. }
                | MediaError::DecodeFailure(_)
                | MediaError::InvalidInput(_)
                | MediaError::FileNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_classification() {
        assert!(MediaError::no_matching_model(40, "none").is_user_error());
        assert!(MediaError::InsufficientFrames { required: 40, available: 3 }.is_user_error());
        assert!(MediaError::decode_failure("bad header").is_user_error());
        assert!(!MediaError::model_load("missing linear1.weight").is_user_error());
        assert!(!MediaError::internal("boom").is_user_error());
    }

    #[test]
    fn test_messages() {
        let err = MediaError::InsufficientFrames { required: 60, available: 12 };
        assert_eq!(err.to_string(), "Video has 12 usable frames, 60 required");
        let err = MediaError::no_matching_model(20, "no checkpoint encodes this window");
        assert!(err.to_string().contains("sequence length 20"));
    }
}
