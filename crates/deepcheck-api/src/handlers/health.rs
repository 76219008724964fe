//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    /// `ml` or `demo`
    pub mode: String,
    pub models_dir: String,
    /// Checkpoint files found in `models_dir`
    pub checkpoints: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness check endpoint (readiness probe).
///
/// In ml mode the models directory must be scannable.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let mode = state.analyzer.mode();
    let selector = deepcheck_media::CheckpointSelector::new(
        &state.engine.models_dir,
        &state.engine.checkpoint_extension,
    );
    let scan = tokio::task::spawn_blocking(move || selector.scan()).await;

    let mut response = ReadinessResponse {
        status: "ready".to_string(),
        mode: mode.as_str().to_string(),
        models_dir: state.engine.models_dir.display().to_string(),
        checkpoints: 0,
        error: None,
    };

    match scan {
        Ok(Ok(found)) => response.checkpoints = found.len(),
        Ok(Err(e)) => response.error = Some(e.to_string()),
        Err(e) => response.error = Some(e.to_string()),
    }

    if mode == deepcheck_models::AnalysisMode::Ml && response.error.is_some() {
        response.status = "not_ready".to_string();
        return Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)));
    }
    Ok(Json(response))
}
