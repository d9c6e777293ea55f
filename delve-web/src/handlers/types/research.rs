//! Search, streaming and research report types

use delve_research::ReportType;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Direct question for the assistant
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    #[serde(default)]
    #[schema(example = "What is retrieval-augmented generation?")]
    pub query: String,
    /// Primary model provider (`anthropic`, `openrouter`, `openai`, `ollama`)
    #[schema(example = "openai")]
    pub model: Option<String>,
}

/// Text answer shared by `/search`, its stream snapshots and `/reason`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TextResponse {
    pub response: String,
}

/// Full research request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReasonRequest {
    #[serde(default)]
    #[schema(example = "Does remote work raise productivity?")]
    pub query: String,
    /// Report type name; unknown names fall back to "Research Report"
    #[schema(example = "Outline Report")]
    pub report_type: Option<String>,
    pub extra_instructions: Option<String>,
}

/// One available report type
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportTypeInfo {
    pub name: ReportType,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportTypesResponse {
    pub report_types: Vec<ReportTypeInfo>,
}
