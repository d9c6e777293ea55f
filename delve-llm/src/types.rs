//! Type definitions for the model invocation layer

use delve_core::{Message, ProviderKind};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// A request bound to one provider, with the model already resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Stream of text deltas from a provider
pub type TextStream = BoxStream<'static, LlmResult<String>>;

/// Error types for model invocation
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{provider} request failed: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} returned no text content")]
    EmptyResponse(ProviderKind),

    #[error("Core error: {0}")]
    Core(Box<delve_core::DelveError>),
}

impl From<delve_core::DelveError> for LlmError {
    fn from(err: delve_core::DelveError) -> Self {
        LlmError::Core(Box::new(err))
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
