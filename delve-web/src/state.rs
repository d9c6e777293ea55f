//! Shared application state

use crate::{WebError, WebResult};
use delve_core::DelveConfig;
use delve_research::ResearchEngine;
use std::sync::Arc;
use tracing::info;

/// State shared by every request handler
///
/// The engine is immutable; each request opens its own research session.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DelveConfig>,
    pub engine: Arc<ResearchEngine>,
}

impl AppState {
    /// Build the research engine from configuration
    pub fn new(config: DelveConfig) -> WebResult<Self> {
        let engine = ResearchEngine::new(&config)
            .map_err(|e| WebError::Config(format!("Failed to build research engine: {}", e)))?;

        info!(
            providers = ?engine.invoker().available_providers(),
            "Application state initialized"
        );

        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    pub fn with_engine(config: DelveConfig, engine: Arc<ResearchEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}
