//! Search, streaming answer and research report handlers

use super::types::{
    ErrorResponse, ReasonRequest, ReportTypeInfo, ReportTypesResponse, SearchRequest,
    TextResponse,
};
use crate::{AppState, WebError, WebResult};
use axum::{
    body::Bytes,
    extract::State,
    response::{sse::Event, Json, Sse},
};
use delve_core::ProviderKind;
use delve_research::ReportType;
use futures::{stream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

const INVALID_BODY: &str = "Empty or invalid JSON in request body";
const EMPTY_QUERY: &str = "Empty query";

/// Parse a JSON request body; empty or malformed input is a 400 with a JSON
/// error body
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> WebResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(WebError::BadRequest(INVALID_BODY.to_string()));
    }

    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        WebError::BadRequest(INVALID_BODY.to_string())
    })
}

fn require_query(query: &str) -> WebResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(WebError::BadRequest(EMPTY_QUERY.to_string()));
    }
    Ok(query)
}

/// Map the request's `model` field to a provider; unknown names use the default
fn requested_provider(model: Option<&str>) -> Option<ProviderKind> {
    let model = model.map(str::trim).filter(|model| !model.is_empty())?;
    match model.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!("{}, using the default provider", e);
            None
        }
    }
}

/// Answer a question directly
#[utoipa::path(
    post,
    path = "/api/search",
    tag = "Assistant",
    summary = "Ask the assistant",
    description = "Answer a question directly through the model fallback chain, without web research",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Answer text, or an apology when every provider failed", body = TextResponse),
        (status = 400, description = "Empty query or invalid body", body = ErrorResponse)
    )
)]
pub async fn search(State(state): State<AppState>, body: Bytes) -> WebResult<Json<TextResponse>> {
    let request: SearchRequest = parse_body(&body)?;
    let query = require_query(&request.query)?;
    let provider = requested_provider(request.model.as_deref());

    info!("Answering query (provider: {:?})", provider);
    let response = state.engine.ask(query, provider).await;

    Ok(Json(TextResponse { response }))
}

/// Stream an answer as cumulative snapshots
#[utoipa::path(
    post,
    path = "/api/search/stream",
    tag = "Assistant",
    summary = "Ask the assistant with streaming",
    description = "Server-sent events; each `data` carries the whole answer so far, a final `done` event closes the stream",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Stream of answer snapshots", content_type = "text/event-stream"),
        (status = 400, description = "Empty query or invalid body", body = ErrorResponse)
    )
)]
pub async fn search_stream(
    State(state): State<AppState>,
    body: Bytes,
) -> WebResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let request: SearchRequest = parse_body(&body)?;
    let query = require_query(&request.query)?;
    let provider = requested_provider(request.model.as_deref());

    info!("Streaming answer (provider: {:?})", provider);
    let snapshots = state
        .engine
        .ask_stream(query, provider)
        .map(|response| Event::default().json_data(TextResponse { response }));
    let done = stream::once(async { Ok(Event::default().event("done").data("[DONE]")) });

    Ok(Sse::new(snapshots.chain(done)).keep_alive(axum::response::sse::KeepAlive::default()))
}

/// Research a question on the web and write a report
#[utoipa::path(
    post,
    path = "/api/reason",
    tag = "Research",
    summary = "Write a research report",
    description = "Plan search queries, gather web and PDF sources, and synthesize a report",
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Report text", body = TextResponse),
        (status = 400, description = "Empty query or invalid body", body = ErrorResponse),
        (status = 500, description = "Research failed", body = ErrorResponse)
    )
)]
pub async fn reason(State(state): State<AppState>, body: Bytes) -> WebResult<Json<TextResponse>> {
    let request: ReasonRequest = parse_body(&body)?;
    let query = require_query(&request.query)?;
    let report_type = request
        .report_type
        .as_deref()
        .map(ReportType::from_name)
        .unwrap_or_default();
    let extra = request.extra_instructions.as_deref().unwrap_or("");

    info!("Research request: {} ({})", query, report_type);
    let report = state.engine.research(query, report_type, extra).await?;

    info!(
        queries = report.queries.len(),
        corpus_chars = report.corpus_chars,
        "Research report written"
    );
    Ok(Json(TextResponse {
        response: report.report,
    }))
}

/// List the report types `/api/reason` accepts
#[utoipa::path(
    get,
    path = "/api/report-types",
    tag = "Research",
    summary = "List report types",
    responses(
        (status = 200, description = "Available report types", body = ReportTypesResponse)
    )
)]
pub async fn report_types(State(state): State<AppState>) -> Json<ReportTypesResponse> {
    Json(ReportTypesResponse {
        report_types: state
            .engine
            .report_types()
            .iter()
            .map(|kind| ReportTypeInfo {
                name: *kind,
                description: kind.description().to_string(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_rejections() {
        let empty = parse_body::<SearchRequest>(&Bytes::from_static(b"  \n"));
        assert!(matches!(empty, Err(WebError::BadRequest(msg)) if msg == INVALID_BODY));

        let invalid = parse_body::<SearchRequest>(&Bytes::from_static(b"{query"));
        assert!(matches!(invalid, Err(WebError::BadRequest(msg)) if msg == INVALID_BODY));

        let missing_query = parse_body::<SearchRequest>(&Bytes::from_static(b"{}")).unwrap();
        assert!(require_query(&missing_query.query).is_err());
    }

    #[test]
    fn test_requested_provider() {
        assert_eq!(requested_provider(Some("openai")), Some(ProviderKind::OpenAi));
        assert_eq!(requested_provider(Some("bedrock")), Some(ProviderKind::Anthropic));
        assert_eq!(requested_provider(Some("mystery")), None);
        assert_eq!(requested_provider(Some("  ")), None);
        assert_eq!(requested_provider(None), None);
    }
}
