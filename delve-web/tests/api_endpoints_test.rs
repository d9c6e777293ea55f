//! HTTP endpoint tests against a stubbed research engine

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use delve_core::{DelveConfig, FetchedDocument, ProviderKind, SearchResult, SourceKind};
use delve_llm::{ChatProvider, ChatRequest, LlmError, LlmResult, ModelInvoker, TextStream};
use delve_research::{ContentFetcher, ResearchEngine, SearchProvider};
use delve_web::{create_app, AppState};
use futures::StreamExt;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Model stub: fixed answers, or a provider error for every call
struct StubModel {
    failing: bool,
}

#[async_trait]
impl ChatProvider for StubModel {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn default_model(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, request: &ChatRequest) -> LlmResult<String> {
        if self.failing {
            return Err(LlmError::Provider {
                provider: ProviderKind::Anthropic,
                message: "overloaded".to_string(),
            });
        }

        let prompt = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if prompt.contains("QUESTION TO RESEARCH") {
            Ok(r#"{"Q1": "remote work"}"#.to_string())
        } else {
            Ok("stub answer".to_string())
        }
    }

    async fn stream(&self, _request: &ChatRequest) -> LlmResult<TextStream> {
        let chunks: Vec<LlmResult<String>> = vec![Ok("stub ".to_string()), Ok("answer".to_string())];
        Ok(futures::stream::iter(chunks).boxed())
    }
}

struct EmptySearch;

#[async_trait]
impl SearchProvider for EmptySearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Vec<SearchResult> {
        Vec::new()
    }
}

struct NoFetch;

#[async_trait]
impl ContentFetcher for NoFetch {
    async fn fetch(&self, url: &str) -> FetchedDocument {
        FetchedDocument::new(url, SourceKind::Html, String::new(), false)
    }
}

fn app_with(providers: Vec<Arc<dyn ChatProvider>>) -> Router {
    let mut config = DelveConfig::default();
    config.llm.retry_base_delay_ms = 1;
    config.research.fetch_delay_ms = 0;

    let invoker = Arc::new(ModelInvoker::new(providers, &config.llm));
    let engine = ResearchEngine::from_parts(&config, invoker, Arc::new(EmptySearch), Arc::new(NoFetch));
    create_app(AppState::with_engine(config, Arc::new(engine)))
}

fn app() -> Router {
    app_with(vec![Arc::new(StubModel { failing: false }) as Arc<dyn ChatProvider>])
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send_json(app(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["providers"], json!(["anthropic"]));
}

#[tokio::test]
async fn test_search_answers() {
    let request = post("/api/search", json!({"query": "What is RAG?", "model": "claude"}).to_string());
    let (status, body) = send_json(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "stub answer"}));
}

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let (status, body) = send_json(app(), post("/api/search", r#"{"query": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Empty query"}));
}

#[tokio::test]
async fn test_search_returns_apology_when_providers_fail() {
    let app = app_with(vec![Arc::new(StubModel { failing: true }) as Arc<dyn ChatProvider>]);
    let (status, body) = send_json(app, post("/api/search", r#"{"query": "hi"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let response = body["response"].as_str().unwrap();
    assert!(response.starts_with("I encountered an error processing your request."));
    assert!(response.contains("overloaded"));
}

#[tokio::test]
async fn test_search_stream_sends_snapshots() {
    let (status, body) = send(app(), post("/api/search/stream", r#"{"query": "hi"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let first = body.find(r#"data: {"response":"stub "}"#).unwrap();
    let second = body.find(r#"data: {"response":"stub answer"}"#).unwrap();
    assert!(first < second);
    assert!(body.contains("event: done"));
}

#[tokio::test]
async fn test_reason_rejects_bad_bodies() {
    for body in ["", "not json", "[1, 2"] {
        let (status, json_body) = send_json(app(), post("/api/reason", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(json_body, json!({"error": "Empty or invalid JSON in request body"}));
    }

    let (status, body) = send_json(app(), post("/api/reason", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Empty query"}));
}

#[tokio::test]
async fn test_reason_writes_report() {
    let request = post(
        "/api/reason",
        json!({"query": "remote work", "report_type": "Poem Report"}).to_string(),
    );
    let (status, body) = send_json(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "stub answer"}));
}

#[tokio::test]
async fn test_reason_without_providers_is_server_error() {
    let (status, body) = send_json(app_with(Vec::new()), post("/api/reason", r#"{"query": "q"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Research error: "));
}

#[tokio::test]
async fn test_report_types_and_openapi() {
    let (status, body) = send_json(app(), get("/api/report-types")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["report_types"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Research Report", "Resource Report", "Outline Report", "Deep Research"]
    );

    let (status, doc) = send_json(app(), get("/api/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/reason"].is_object());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/search")
        .header(header::ORIGIN, "http://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
