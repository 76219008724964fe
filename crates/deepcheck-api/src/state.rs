//! Application state.

use std::sync::Arc;

use deepcheck_media::{select_analyzer, AuthenticityAnalyzer, EngineConfig, MediaResult};
use deepcheck_storage::{AuditLog, FeedbackLog, UploadStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine: Arc<EngineConfig>,
    /// Chosen once at startup
    pub analyzer: Arc<dyn AuthenticityAnalyzer>,
    pub audit_log: AuditLog,
    pub feedback_log: FeedbackLog,
    pub uploads: UploadStore,
}

impl AppState {
    /// Create new application state, selecting the analysis path.
    pub fn new(config: ApiConfig, engine: EngineConfig) -> MediaResult<Self> {
        let analyzer: Arc<dyn AuthenticityAnalyzer> = Arc::from(select_analyzer(&engine)?);
        Ok(Self::with_analyzer(config, engine, analyzer))
    }

    pub fn with_analyzer(
        config: ApiConfig,
        engine: EngineConfig,
        analyzer: Arc<dyn AuthenticityAnalyzer>,
    ) -> Self {
        Self {
            audit_log: AuditLog::in_dir(&config.log_dir),
            feedback_log: FeedbackLog::in_dir(&config.log_dir),
            uploads: UploadStore::new(&config.upload_dir),
            engine: Arc::new(engine),
            analyzer,
            config,
        }
    }
}
