//! Delve Web Server
//!
//! JSON and SSE endpoints over the research engine.

pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::DelveServer;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    Router,
};
use delve_research::ResearchError;
use handlers::ErrorResponse;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    // Browser frontends may be served from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("Research error: {0}")]
    Research(#[from] ResearchError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            WebError::Research(ResearchError::Core(core)) => core.log(),
            _ if status.is_server_error() => error!("Request failed: {}", self),
            _ => {}
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            WebError::BadRequest("Empty query".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebError::Config("missing".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_research_error_message() {
        let err = WebError::from(ResearchError::Config {
            message: "No model provider is configured".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Research error: Configuration error: No model provider is configured"
        );
    }

    #[test]
    fn test_core_errors_are_server_errors() {
        let err = WebError::from(ResearchError::from(delve_core::network_error!(
            "Failed to build HTTP client",
            "search"
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Research error: Core error: Network error: Failed to build HTTP client"
        );
    }
}
