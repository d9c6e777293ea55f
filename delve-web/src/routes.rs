//! Route definitions for the Delve web server

use crate::{handlers, openapi, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Direct answers
        .route("/search", post(handlers::search))
        .route("/search/stream", post(handlers::search_stream))
        // Web research
        .route("/reason", post(handlers::reason))
        .route("/report-types", get(handlers::report_types))
        // API documentation
        .route("/openapi.json", get(openapi::openapi_json))
}
