//! Research engine: wires planner, aggregator and synthesizer together

use super::aggregator::{ResearchAggregator, ResearchSession};
use super::planner::QueryPlanner;
use super::synthesizer::ReportSynthesizer;
use super::templates::ASSISTANT_SYSTEM_PROMPT;
use super::types::{ReportType, ResearchReport};
use crate::sources::{ContentFetcher, HttpContentFetcher, SearchProvider, SearxngSearch};
use crate::{ResearchError, ResearchResult};
use delve_core::performance::measure_async;
use delve_core::{
    DelveConfig, Message, ModelCallRequest, ProviderKind, ResearchQuery, Subtopic,
};
use delve_llm::ModelInvoker;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::info;

/// Question-to-report research pipeline
///
/// Immutable once built; share it behind an `Arc`. Every call to
/// [`ResearchEngine::research`] runs in its own [`ResearchSession`].
pub struct ResearchEngine {
    invoker: Arc<ModelInvoker>,
    planner: Arc<QueryPlanner>,
    aggregator: ResearchAggregator,
    synthesizer: ReportSynthesizer,
    temperature: f32,
    answer_max_tokens: u32,
}

impl ResearchEngine {
    /// Build the engine with the configured providers, SearXNG and HTTP fetcher
    pub fn new(config: &DelveConfig) -> ResearchResult<Self> {
        let invoker = Arc::new(ModelInvoker::from_config(&config.llm));
        let search: Arc<dyn SearchProvider> = Arc::new(SearxngSearch::new(&config.search)?);
        let fetcher: Arc<dyn ContentFetcher> = Arc::new(HttpContentFetcher::new(&config.fetch)?);

        info!(
            providers = ?invoker.available_providers(),
            search = %config.search.base_url,
            "Research engine initialized"
        );

        Ok(Self::from_parts(config, invoker, search, fetcher))
    }

    /// Build the engine from explicit components
    pub fn from_parts(
        config: &DelveConfig,
        invoker: Arc<ModelInvoker>,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        let temperature = config.llm.temperature;
        let planner = Arc::new(QueryPlanner::new(
            invoker.clone(),
            &config.research,
            temperature,
        ));
        let aggregator = ResearchAggregator::new(
            planner.clone(),
            search,
            fetcher,
            &config.research,
            config.search.max_results,
        );
        let synthesizer = ReportSynthesizer::new(invoker.clone(), &config.research, temperature);

        Self {
            invoker,
            planner,
            aggregator,
            synthesizer,
            temperature,
            answer_max_tokens: config.research.answer_max_tokens,
        }
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    pub fn report_types(&self) -> &'static [ReportType] {
        &ReportType::ALL
    }

    /// Research `question` end to end and write a report
    ///
    /// Fails only when no model provider is configured; upstream failures
    /// end up as placeholders in the corpus or as the apology text.
    pub async fn research(
        &self,
        question: &str,
        report_type: ReportType,
        extra_instructions: &str,
    ) -> ResearchResult<ResearchReport> {
        if self.invoker.available_providers().is_empty() {
            return Err(ResearchError::Config {
                message: "No model provider is configured".to_string(),
            });
        }

        let mut session = ResearchSession::new(question);
        info!(session_id = %session.id, report_type = %report_type, "Starting research: {}", question);

        let corpus = measure_async("build_corpus", self.aggregator.build_corpus(&mut session)).await;
        let report = measure_async(
            "synthesize_report",
            self.synthesizer
                .synthesize(question, &corpus, report_type, extra_instructions),
        )
        .await;

        Ok(ResearchReport {
            question: question.to_string(),
            report_type,
            queries: session.queries().to_vec(),
            corpus_chars: corpus.chars().count(),
            report,
        })
    }

    /// Build the corpus for an existing session without writing a report
    pub async fn build_corpus(&self, session: &mut ResearchSession) -> String {
        self.aggregator.build_corpus(session).await
    }

    fn answer_request(&self, query: &str) -> ModelCallRequest {
        ModelCallRequest::new(
            vec![
                Message::system(ASSISTANT_SYSTEM_PROMPT),
                Message::user(query),
            ],
            self.temperature,
        )
        .with_max_output_tokens(self.answer_max_tokens)
    }

    /// Answer `query` directly, without a research pass
    pub async fn ask(&self, query: &str, provider: Option<ProviderKind>) -> String {
        info!(provider = ?provider, "Answering query directly");
        self.invoker
            .complete(&self.answer_request(query), provider)
            .await
    }

    /// Stream a direct answer as cumulative snapshots
    pub fn ask_stream(
        &self,
        query: &str,
        provider: Option<ProviderKind>,
    ) -> BoxStream<'static, String> {
        info!(provider = ?provider, "Streaming direct answer");
        self.invoker
            .complete_stream(&self.answer_request(query), provider)
    }

    pub async fn plan(&self, question: &str) -> Vec<ResearchQuery> {
        self.planner.plan(question).await
    }

    pub async fn plan_subtopics(&self, question: &str) -> Vec<Subtopic> {
        self.planner.plan_subtopics(question).await
    }
}
