//! Model invocation with token budgeting, retry and provider fallback
//!
//! `ModelInvoker` walks an ordered chain of `ChatProvider`s. Each provider
//! gets `max_attempts` tries with exponential backoff; the first success wins.
//! When the whole chain fails the caller receives an apology string instead of
//! an error.

use crate::llm_client::providers_from_config;
use crate::provider::ChatProvider;
use crate::token_counter::TokenBudget;
use crate::types::{ChatRequest, LlmError, LlmResult};
use delve_core::{retry_async, LlmSettings, ModelCallRequest, ProviderKind, RetryConfig};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text returned by `complete` after every provider failed
pub fn completion_apology(error: &impl std::fmt::Display) -> String {
    format!(
        "I encountered an error processing your request. Please try with a shorter or simpler query. Error: {}",
        error
    )
}

/// Text appended to a stream that failed part way
pub fn stream_apology(error: &impl std::fmt::Display) -> String {
    format!(
        "\n\nI apologize, but I encountered an error: {}\nPlease try again with a shorter query.",
        error
    )
}

pub struct ModelInvoker {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    default_provider: ProviderKind,
    fallback_order: Vec<ProviderKind>,
    retry: RetryConfig,
    budget: TokenBudget,
}

impl ModelInvoker {
    /// Build siumai providers for every credentialed backend in `settings`
    pub fn from_config(settings: &LlmSettings) -> Self {
        Self::new(providers_from_config(settings), settings)
    }

    pub fn new(providers: Vec<Arc<dyn ChatProvider>>, settings: &LlmSettings) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.kind(), provider))
            .collect();

        Self {
            providers,
            default_provider: settings.default_provider,
            fallback_order: settings.fallback_order.clone(),
            retry: RetryConfig::exponential(settings.max_attempts, settings.retry_base_delay_ms),
            budget: TokenBudget::from(settings),
        }
    }

    pub fn default_provider(&self) -> ProviderKind {
        self.default_provider
    }

    /// Providers that can actually be called
    pub fn available_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.providers.contains_key(kind))
            .collect()
    }

    /// Primary followed by the configured fallback order, without repeats
    /// and without providers that are not configured
    pub fn chain(&self, primary: Option<ProviderKind>) -> Vec<Arc<dyn ChatProvider>> {
        let primary = primary.unwrap_or(self.default_provider);
        let mut seen = Vec::new();

        std::iter::once(primary)
            .chain(self.fallback_order.iter().copied())
            .filter(|kind| {
                if seen.contains(kind) {
                    return false;
                }
                seen.push(*kind);
                true
            })
            .filter_map(|kind| {
                let provider = self.providers.get(&kind).cloned();
                if provider.is_none() {
                    debug!(provider = %kind, "Provider not configured, skipping");
                }
                provider
            })
            .collect()
    }

    /// Resolve the model and apply the token ceiling for one provider
    fn bind(
        &self,
        request: &ModelCallRequest,
        provider: &dyn ChatProvider,
        is_primary: bool,
    ) -> ChatRequest {
        let model = match (&request.model, is_primary) {
            (Some(model), true) => model.clone(),
            _ => provider.default_model().to_string(),
        };

        let mut messages = request.messages.clone();
        self.budget.fit_messages(&mut messages, &model);

        ChatRequest {
            messages,
            model,
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        }
    }

    /// Run the fallback chain and return the last error when it is exhausted
    pub async fn try_complete(
        &self,
        request: &ModelCallRequest,
        primary: Option<ProviderKind>,
    ) -> LlmResult<String> {
        let chain = self.chain(primary);
        let mut last_error = None;

        for (index, provider) in chain.iter().enumerate() {
            let chat_request = self.bind(request, provider.as_ref(), index == 0);
            let provider = provider.as_ref();
            let chat_request = &chat_request;

            let result = retry_async(
                move || provider.complete(chat_request),
                &self.retry,
                "model_call",
            )
            .await;

            match result {
                Ok(text) => {
                    if index > 0 {
                        info!(provider = %provider.kind(), "Fallback provider succeeded");
                    }
                    return Ok(text);
                }
                Err(e) => {
                    warn!(
                        provider = %provider.kind(),
                        model = %chat_request.model,
                        error = %e,
                        "Provider exhausted its attempts"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Config("No model provider is configured".to_string())))
    }

    /// Complete a request, answering with an apology when every provider fails
    pub async fn complete(&self, request: &ModelCallRequest, primary: Option<ProviderKind>) -> String {
        match self.try_complete(request, primary).await {
            Ok(text) => text,
            Err(e) => completion_apology(&e),
        }
    }

    /// Stream cumulative snapshots of the response from the primary provider
    ///
    /// No retry and no fallback. An error ends the stream with one final
    /// snapshot carrying the apology text.
    pub fn complete_stream(
        &self,
        request: &ModelCallRequest,
        primary: Option<ProviderKind>,
    ) -> BoxStream<'static, String> {
        let kind = primary.unwrap_or(self.default_provider);
        let bound = self
            .providers
            .get(&kind)
            .cloned()
            .map(|provider| {
                let chat_request = self.bind(request, provider.as_ref(), true);
                (provider, chat_request)
            });

        Box::pin(async_stream::stream! {
            let mut accumulated = String::new();

            match bound {
                None => {
                    let err = LlmError::Config(format!("{} is not configured", kind));
                    yield stream_apology(&err);
                }
                Some((provider, chat_request)) => match provider.stream(&chat_request).await {
                    Ok(mut deltas) => {
                        while let Some(delta) = deltas.next().await {
                            match delta {
                                Ok(text) => {
                                    accumulated.push_str(&text);
                                    yield accumulated.clone();
                                }
                                Err(e) => {
                                    warn!(provider = %kind, error = %e, "Stream failed");
                                    accumulated.push_str(&stream_apology(&e));
                                    yield accumulated.clone();
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!(provider = %kind, error = %e, "Failed to open stream");
                        accumulated.push_str(&stream_apology(&e));
                        yield accumulated;
                    }
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextStream;
    use async_trait::async_trait;
    use delve_core::Message;
    use std::sync::Mutex;

    struct EchoProvider {
        kind: ProviderKind,
        seen_models: Mutex<Vec<String>>,
    }

    impl EchoProvider {
        fn new(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                seen_models: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn default_model(&self) -> &str {
            "echo-default"
        }

        async fn complete(&self, request: &ChatRequest) -> LlmResult<String> {
            self.seen_models.lock().unwrap().push(request.model.clone());
            Ok(format!("{}:{}", self.kind, request.model))
        }

        async fn stream(&self, _request: &ChatRequest) -> LlmResult<TextStream> {
            Ok(futures::stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]).boxed())
        }
    }

    fn settings(default_provider: ProviderKind, fallback_order: Vec<ProviderKind>) -> LlmSettings {
        LlmSettings {
            default_provider,
            fallback_order,
            retry_base_delay_ms: 1,
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_chain_deduplicates_and_skips_missing() {
        let openai = EchoProvider::new(ProviderKind::OpenAi);
        let ollama = EchoProvider::new(ProviderKind::Ollama);
        let invoker = ModelInvoker::new(
            vec![openai as Arc<dyn ChatProvider>, ollama],
            &settings(
                ProviderKind::Anthropic,
                vec![ProviderKind::Anthropic, ProviderKind::OpenAi, ProviderKind::OpenAi],
            ),
        );

        let kinds: Vec<_> = invoker.chain(None).iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ProviderKind::OpenAi]);

        let kinds: Vec<_> = invoker
            .chain(Some(ProviderKind::Ollama))
            .iter()
            .map(|p| p.kind())
            .collect();
        assert_eq!(kinds, vec![ProviderKind::Ollama, ProviderKind::OpenAi]);
    }

    #[tokio::test]
    async fn test_explicit_model_applies_to_primary() {
        let openai = EchoProvider::new(ProviderKind::OpenAi);
        let invoker = ModelInvoker::new(
            vec![openai.clone() as Arc<dyn ChatProvider>],
            &settings(ProviderKind::OpenAi, vec![]),
        );

        let request =
            ModelCallRequest::new(vec![Message::user("hi")], 0.7).with_model("gpt-4o");
        let text = invoker.complete(&request, None).await;
        assert_eq!(text, "openai:gpt-4o");
        assert_eq!(openai.seen_models.lock().unwrap().as_slice(), ["gpt-4o"]);
    }

    #[tokio::test]
    async fn test_empty_chain_apologizes() {
        let invoker = ModelInvoker::new(vec![], &settings(ProviderKind::OpenAi, vec![]));
        let request = ModelCallRequest::new(vec![Message::user("hi")], 0.7);
        let text = invoker.complete(&request, None).await;
        assert!(text.starts_with("I encountered an error processing your request."));
        assert!(text.contains("No model provider is configured"));
    }

    #[tokio::test]
    async fn test_stream_yields_cumulative_snapshots() {
        let invoker = ModelInvoker::new(
            vec![EchoProvider::new(ProviderKind::OpenAi) as Arc<dyn ChatProvider>],
            &settings(ProviderKind::OpenAi, vec![]),
        );
        let request = ModelCallRequest::new(vec![Message::user("hi")], 0.7);
        let snapshots: Vec<String> = invoker.complete_stream(&request, None).collect().await;
        assert_eq!(snapshots, vec!["a".to_string(), "ab".to_string()]);
    }
}
