//! Delve Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use delve_core::DelveConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main Delve web server
pub struct DelveServer {
    address: String,
    state: AppState,
}

impl DelveServer {
    /// Create a server with a research engine built from `config`
    pub fn new(config: DelveConfig) -> WebResult<Self> {
        let address = config.server.address();
        let state = AppState::new(config)?;

        Ok(Self { address, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            address: state.config.server.address(),
            state,
        }
    }

    /// Start the web server and run until shutdown
    pub async fn start(self) -> WebResult<()> {
        info!("Starting Delve Web Server");

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", self.address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server shut down gracefully");
        Ok(())
    }

    /// Get the bind address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
