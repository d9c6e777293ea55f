//! Provider strategy seam
//!
//! Every backend the invoker can fall back to implements `ChatProvider`.

use crate::types::{ChatRequest, LlmResult, TextStream};
use async_trait::async_trait;
use delve_core::ProviderKind;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Model used when the request does not name one
    fn default_model(&self) -> &str;

    /// One completion call, no retry
    async fn complete(&self, request: &ChatRequest) -> LlmResult<String>;

    /// Open a stream of text deltas
    async fn stream(&self, request: &ChatRequest) -> LlmResult<TextStream>;
}
