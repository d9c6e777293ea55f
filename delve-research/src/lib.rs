//! Delve Research - Research pipeline built on the model invocation layer
//!
//! This crate turns a question into a report:
//!
//! - **Sources**: SearXNG search and HTML/PDF content fetching
//! - **Planning**: model-driven search queries with deterministic fallbacks
//! - **Aggregation**: one bounded corpus per research session
//! - **Synthesis**: report templates over the budgeted corpus
//!
//! ## Architecture
//!
//! - **Core** (delve-core): types, configuration, logging
//! - **Models** (delve-llm): providers, retry and fallback
//! - **Pipeline** (this crate): research orchestration
//! - **Presentation** (delve-web/cli): user interfaces

pub mod research;
pub mod sources;

pub use research::{
    CorpusBuilder, QueryPlanner, ReportSynthesizer, ReportType, ResearchAggregator,
    ResearchEngine, ResearchReport, ResearchSession,
};
pub use sources::{ContentFetcher, HttpContentFetcher, SearchProvider, SearxngSearch};

use delve_core::DelveError;
use delve_llm::LlmError;
use thiserror::Error;

/// Research pipeline errors
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Core error: {0}")]
    Core(#[from] DelveError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub type ResearchResult<T> = Result<T, ResearchError>;
