//! Plain-text analysis reports.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;
use deepcheck_models::{render_report, report_filename};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Download the report for the latest verdict on `video`.
pub async fn get_report(
    State(state): State<AppState>,
    Path(video): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .audit_log
        .latest_for(&video)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no analysis recorded for {video}")))?;

    let body = render_report(&record, Utc::now());
    let disposition = format!("attachment; filename=\"{}\"", report_filename(&record.video));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
