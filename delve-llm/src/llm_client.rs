//! LLM client integration using siumai
//!
//! `SiumaiProvider` adapts one configured backend to the `ChatProvider`
//! seam. A fresh siumai client is built per call so the request's model,
//! temperature and token cap apply.

use crate::provider::ChatProvider;
use crate::types::{ChatRequest, LlmError, LlmResult, TextStream};
use async_trait::async_trait;
use delve_core::{LlmSettings, Message, ProviderConfig, ProviderKind, Role};
use futures::StreamExt;
use siumai::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A siumai-backed provider
pub struct SiumaiProvider {
    kind: ProviderKind,
    settings: ProviderConfig,
}

impl SiumaiProvider {
    pub fn new(kind: ProviderKind, settings: ProviderConfig) -> Self {
        Self { kind, settings }
    }

    /// Whether the provider has what it needs to make a call
    pub fn has_credentials(&self) -> bool {
        match self.kind {
            ProviderKind::Ollama => true,
            _ => self
                .settings
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty()),
        }
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::Config(format!("{} API key not found", self.kind)))
    }

    fn provider_error(&self, err: impl std::fmt::Display) -> LlmError {
        LlmError::Provider {
            provider: self.kind,
            message: err.to_string(),
        }
    }

    /// Build the appropriate siumai client for this provider
    async fn build_client(&self, request: &ChatRequest) -> LlmResult<Box<dyn LlmClient>> {
        match self.kind {
            ProviderKind::OpenAi | ProviderKind::OpenRouter => {
                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(self.api_key()?)
                    .model(&request.model)
                    .temperature(request.temperature);

                if let Some(max_tokens) = request.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &self.settings.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| self.provider_error(format!("failed to build client: {}", e)))?;

                Ok(Box::new(client))
            }
            ProviderKind::Anthropic => {
                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(self.api_key()?)
                    .model(&request.model)
                    .temperature(request.temperature);

                if let Some(max_tokens) = request.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &self.settings.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| self.provider_error(format!("failed to build client: {}", e)))?;

                Ok(Box::new(client))
            }
            ProviderKind::Ollama => {
                let base_url = self
                    .settings
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&request.model)
                    .base_url(&base_url)
                    .temperature(request.temperature);

                if let Some(max_tokens) = request.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| self.provider_error(format!("failed to build client: {}", e)))?;

                Ok(Box::new(client))
            }
        }
    }
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|message| match message.role {
            Role::System => ChatMessage::system(message.content.as_str()).build(),
            Role::User => ChatMessage::user(message.content.as_str()).build(),
            Role::Assistant => ChatMessage::assistant(message.content.as_str()).build(),
        })
        .collect()
}

#[async_trait]
impl ChatProvider for SiumaiProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn default_model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, request: &ChatRequest) -> LlmResult<String> {
        let start_time = Instant::now();
        let client = self.build_client(request).await?;

        debug!(
            provider = %self.kind,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = client
            .chat(to_chat_messages(&request.messages))
            .await
            .map_err(|e| self.provider_error(e))?;

        match response.content_text() {
            Some(content) if !content.trim().is_empty() => {
                info!(
                    provider = %self.kind,
                    model = %request.model,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    chars = content.len(),
                    "Generated response"
                );
                Ok(content.to_string())
            }
            _ => Err(LlmError::EmptyResponse(self.kind)),
        }
    }

    async fn stream(&self, request: &ChatRequest) -> LlmResult<TextStream> {
        let client = self.build_client(request).await?;
        let kind = self.kind;

        let events = client
            .chat_stream(to_chat_messages(&request.messages), None)
            .await
            .map_err(|e| self.provider_error(e))?;

        let deltas = events.filter_map(move |event| async move {
            match event {
                Ok(ChatStreamEvent::ContentDelta { delta, .. }) => Some(Ok(delta)),
                Ok(_) => None,
                Err(e) => Some(Err(LlmError::Provider {
                    provider: kind,
                    message: e.to_string(),
                })),
            }
        });

        Ok(deltas.boxed())
    }
}

/// Build every configured provider that has credentials
///
/// Providers without an API key are skipped with a warning; Ollama needs none.
pub fn providers_from_config(settings: &LlmSettings) -> Vec<Arc<dyn ChatProvider>> {
    ProviderKind::ALL
        .iter()
        .filter_map(|&kind| {
            let provider = SiumaiProvider::new(kind, settings.providers.get(kind).clone());
            if provider.has_credentials() {
                Some(Arc::new(provider) as Arc<dyn ChatProvider>)
            } else {
                warn!(provider = %kind, "No API key configured, provider disabled");
                None
            }
        })
        .collect()
}
