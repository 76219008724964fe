//! Local persistence for the Deepcheck backend.
//!
//! This crate provides:
//! - The verdict audit log and the statistics derived from it
//! - The feedback log
//! - Uploaded video storage
//! - Checkpoint manifest handling and download from Google Drive

pub mod audit_log;
pub mod error;
pub mod feedback;
pub mod jsonl;
pub mod manifest;
pub mod sync;
pub mod uploads;

pub use audit_log::{AuditLog, DETECTIONS_FILE};
pub use error::{StorageError, StorageResult};
pub use feedback::{FeedbackLog, FEEDBACK_FILE};
pub use manifest::{compute_sha256, should_download, ManifestEntry, ModelManifest};
pub use sync::{ModelSync, SyncAction, SyncOptions, SyncOutcome, DRIVE_BASE_URL};
pub use uploads::UploadStore;
