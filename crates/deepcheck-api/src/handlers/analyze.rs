//! Video upload and analysis.

use axum::extract::{Multipart, State};
use axum::Extension;
use axum::Json;
use deepcheck_media::SideImages;
use deepcheck_models::{is_allowed_video_file, VerdictRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Multipart field carrying the video.
pub const VIDEO_FIELD: &str = "upload_video_file";
/// Multipart field carrying the window size.
pub const SEQUENCE_LENGTH_FIELD: &str = "sequence_length";

/// Analysis response.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: VerdictRecord,
    /// Display copies of the sampled frames (heuristic path only)
    pub frames: Vec<String>,
    /// Bordered centre crops (heuristic path only)
    pub faces: Vec<String>,
    pub is_demo: bool,
}

struct UploadForm {
    file_name: String,
    bytes: Vec<u8>,
    sequence_length: u32,
}

fn parse_sequence_length(raw: &str) -> ApiResult<u32> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("sequence_length must be an integer, got {raw:?}")))?;
    if value <= 0 {
        return Err(ApiError::validation("sequence_length must be positive"));
    }
    u32::try_from(value).map_err(|_| ApiError::validation("sequence_length is too large"))
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut video: Option<(String, Vec<u8>)> = None;
    let mut sequence_length: Option<u32> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some(VIDEO_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                video = Some((file_name, bytes.to_vec()));
            }
            Some(SEQUENCE_LENGTH_FIELD) => {
                sequence_length = Some(parse_sequence_length(&field.text().await?)?);
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        video.ok_or_else(|| ApiError::bad_request(format!("missing {VIDEO_FIELD} field")))?;
    let sequence_length = sequence_length
        .ok_or_else(|| ApiError::bad_request(format!("missing {SEQUENCE_LENGTH_FIELD} field")))?;

    if !is_allowed_video_file(&file_name) {
        return Err(ApiError::validation(format!(
            "unsupported video type: {file_name:?}"
        )));
    }

    Ok(UploadForm {
        file_name,
        bytes,
        sequence_length,
    })
}

/// Upload a video and analyze it.
pub async fn analyze_video(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let form = read_form(multipart).await?;

    let video_path = state.uploads.store(&form.file_name, &form.bytes).await?;
    let extension = video_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    metrics::record_upload(&extension, form.bytes.len());

    let analyzer = state.analyzer.clone();
    let sequence_length = form.sequence_length;
    let path = video_path.clone();
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&path, sequence_length))
        .await
        .map_err(|e| ApiError::internal(format!("analysis task failed: {e}")))?;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(request_id = %request_id, "Analysis of {} failed: {}", video_path.display(), e);
            return Err(e.into());
        }
    };

    state.audit_log.append(&outcome.record).await?;

    info!(
        request_id = %request_id,
        video = %outcome.record.video,
        verdict = %outcome.record.verdict,
        confidence = outcome.record.confidence,
        "Analysis complete"
    );

    let SideImages { frames, faces } = outcome.side_images;
    let is_demo = outcome.record.is_demo();
    Ok(Json(AnalyzeResponse {
        result: outcome.record,
        frames,
        faces,
        is_demo,
    }))
}
