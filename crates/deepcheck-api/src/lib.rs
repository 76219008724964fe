//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video upload and authenticity analysis
//! - Detection statistics and per-video reports
//! - User feedback capture
//! - Side images under `/static` and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
