//! Shared data models for the Deepcheck backend.
//!
//! This crate provides Serde-serializable types for:
//! - Verdicts and analysis modes
//! - Verdict records written to the audit log
//! - Detection statistics derived from the audit log
//! - User feedback entries
//! - Plain-text analysis reports
//! - Upload validation helpers

pub mod record;
pub mod report;
pub mod stats;
pub mod upload;
pub mod verdict;

// Re-export common types
pub use record::{utc_timestamp, FeedbackEntry, VerdictRecord};
pub use report::{render_report, report_filename};
pub use stats::{DetectionStats, StatsAccumulator};
pub use upload::{
    is_allowed_video_file, numbered_upload_name, uploaded_file_name, ALLOWED_VIDEO_EXTENSIONS,
};
pub use verdict::{AnalysisMode, AnalysisModeParseError, Verdict, VerdictParseError};
