//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "deepcheck_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "deepcheck_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "deepcheck_http_requests_in_flight";

    // Upload and feedback metrics
    pub const UPLOADS_TOTAL: &str = "deepcheck_uploads_total";
    pub const UPLOAD_BYTES: &str = "deepcheck_upload_bytes";
    pub const FEEDBACK_TOTAL: &str = "deepcheck_feedback_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a stored upload.
pub fn record_upload(extension: &str, bytes: usize) {
    let labels = [("extension", extension.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
    histogram!(names::UPLOAD_BYTES).record(bytes as f64);
}

/// Record feedback submission.
pub fn record_feedback(verdict: &str) {
    let labels = [("verdict", verdict.to_string())];
    counter!(names::FEEDBACK_TOTAL, &labels).increment(1);
}

fn report_path_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex_lite::Regex::new(r"/reports/[^/]+$").expect("valid regex"))
}

fn static_path_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex_lite::Regex::new(r"^/static/.*$").expect("valid regex"))
}

/// Sanitize path for metrics labels (video names, static files).
fn sanitize_path(path: &str) -> String {
    let path = report_path_pattern().replace_all(path, "/reports/:video");
    let path = static_path_pattern().replace_all(&path, "/static/*");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/reports/uploaded_1700000000.mp4"),
            "/api/reports/:video"
        );
        assert_eq!(
            sanitize_path("/static/images/demo/demo_frame_00.jpg"),
            "/static/*"
        );
        assert_eq!(sanitize_path("/api/stats"), "/api/stats");
    }
}
