//! Detection statistics.

use axum::extract::State;
use axum::Json;
use deepcheck_models::DetectionStats;

use crate::error::ApiResult;
use crate::state::AppState;

/// Statistics over the whole audit log, recomputed per request.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<DetectionStats>> {
    Ok(Json(state.audit_log.stats().await?))
}
