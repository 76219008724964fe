//! User feedback on verdicts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use deepcheck_models::FeedbackEntry;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub video_name: String,
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub status: String,
}

/// Append feedback to the feedback log.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let feedback = request.feedback.trim();
    if feedback.is_empty() {
        return Err(ApiError::bad_request("Please add some feedback before submitting."));
    }

    let entry = FeedbackEntry::new(
        request.video_name,
        request.verdict,
        request.confidence,
        feedback,
    );
    state.feedback_log.append(&entry).await?;
    metrics::record_feedback(&entry.verdict);

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            status: "received".to_string(),
        }),
    ))
}
