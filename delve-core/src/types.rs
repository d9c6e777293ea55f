//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported language-model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Managed foundation-model service (Claude models)
    Anthropic,
    /// OpenAI-compatible router in front of many model vendors
    OpenRouter,
    /// OpenAI, also the baseline of the fallback chain
    OpenAi,
    /// Local Ollama server, no credentials required
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenRouter,
        ProviderKind::OpenAi,
        ProviderKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" | "bedrock" => Ok(ProviderKind::Anthropic),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(format!("Unknown model provider: {}", other)),
        }
    }
}

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message sent to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request handed to the model invocation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCallRequest {
    /// Ordered conversation
    pub messages: Vec<Message>,
    /// Explicit model id for the primary provider; `None` uses the provider default
    pub model: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

impl ModelCallRequest {
    pub fn new(messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            messages,
            model: None,
            temperature,
            max_output_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_tokens);
        self
    }
}

/// One planned search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    /// Identifier unique within a planning run ("Q1", "subtopic_2/Q1")
    pub id: String,
    pub text: String,
    /// Title of the subtopic this query explores
    pub subtopic: Option<String>,
}

impl ResearchQuery {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            subtopic: None,
        }
    }

    pub fn with_subtopic(mut self, subtopic: impl Into<String>) -> Self {
        self.subtopic = Some(subtopic.into());
        self
    }
}

/// A subtopic with its own search queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
    pub id: String,
    pub title: String,
    pub queries: Vec<String>,
}

/// How a fetched document was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Pdf,
    Error,
}

/// Cleaned text retrieved from a result URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub url: String,
    pub source_kind: SourceKind,
    /// Always bounded; placeholders describe failures
    pub clean_text: String,
    pub truncated: bool,
}

impl FetchedDocument {
    pub fn new(url: &str, source_kind: SourceKind, clean_text: String, truncated: bool) -> Self {
        Self {
            url: url.to_string(),
            source_kind,
            clean_text,
            truncated,
        }
    }

    /// A placeholder document describing a failure
    pub fn error(url: &str, message: impl Into<String>) -> Self {
        Self::new(url, SourceKind::Error, message.into(), false)
    }

    pub fn is_error(&self) -> bool {
        self.source_kind == SourceKind::Error
    }
}

/// A search hit, optionally enriched with the fetched page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<FetchedDocument>,
}

impl SearchHit {
    pub fn clean_text(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.clean_text.as_str())
    }
}

/// Sentinel record for a failed search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFailure {
    pub error: String,
    pub query: String,
}

/// One element of a search response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResult {
    Hit(SearchHit),
    Failed(SearchFailure),
}

impl SearchResult {
    pub fn failed(error: impl Into<String>, query: &str) -> Self {
        SearchResult::Failed(SearchFailure {
            error: error.into(),
            query: query.to_string(),
        })
    }

    pub fn as_hit(&self) -> Option<&SearchHit> {
        match self {
            SearchResult::Hit(hit) => Some(hit),
            SearchResult::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_aliases() {
        assert_eq!(
            "bedrock".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            " OpenRouter ".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenRouter
        );
        assert!("mystery".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_failed_search_serializes_flat() {
        let failed = SearchResult::failed("Search failed", "rust async");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "Search failed", "query": "rust async"})
        );
    }
}
