//! Clinic API - REST service of the dental clinic back office
//!
//! This crate provides:
//! - Environment-driven configuration ([`config::AppConfig`])
//! - The `/api` router over the SQLite pool
//! - Error mapping from the data and domain layers to JSON responses

use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// The full application: routes plus tracing, CORS, compression and the
/// in-flight request limit
pub fn app(state: AppState, config: &AppConfig) -> Router {
    routes::router(state)
        .layer(ConcurrencyLimitLayer::new(config.max_concurrency.max(1)))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
