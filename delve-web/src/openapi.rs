//! OpenAPI specification for the Delve web server

use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers::{
    ErrorResponse, HealthResponse, ReasonRequest, ReportTypeInfo, ReportTypesResponse,
    SearchRequest, TextResponse,
};
use delve_research::ReportType;

/// Main OpenAPI specification for the Delve web server
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Delve Web API",
        version = "0.1.0",
        description = "AI research assistant: direct answers and web-researched reports",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::search,
        crate::handlers::search_stream,
        crate::handlers::reason,
        crate::handlers::report_types,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            SearchRequest,
            TextResponse,
            ReasonRequest,
            ReportType,
            ReportTypeInfo,
            ReportTypesResponse,
        )
    ),
    tags(
        (name = "Health", description = "Server status"),
        (name = "Assistant", description = "Direct model answers"),
        (name = "Research", description = "Web research and report writing")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/api/search",
            "/api/search/stream",
            "/api/reason",
            "/api/report-types",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
