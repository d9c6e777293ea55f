//! Delve Web Server
//!
//! HTTP interface for the Delve research assistant.

use anyhow::Context;
use clap::Parser;
use delve_core::{init_logging, DelveConfig, LoggingConfig};
use delve_web::DelveServer;
use std::path::PathBuf;
use tracing::{info, warn};

/// Delve Web Server - AI research assistant over HTTP
#[derive(Parser)]
#[command(name = "delve-web")]
#[command(about = "HTTP interface for the Delve research assistant")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables before the config reads them
    dotenvy::dotenv().ok();

    let mut config =
        DelveConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let mut logging = config.logging.clone();
    if let Some(level) = args.log_level {
        logging.level = level;
    }
    init_logging(&logging)
        .or_else(|_| init_logging(&LoggingConfig::default()))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let server = DelveServer::new(config).context("Failed to build server")?;

    let providers = server.state().engine.invoker().available_providers();
    if providers.is_empty() {
        warn!("No model provider is configured; set ANTHROPIC_API_KEY, OPENROUTER_API_KEY, OPENAI_API_KEY or OLLAMA_HOST");
    } else {
        info!("Model providers: {:?}", providers);
    }

    server.start().await.context("Server failed")?;
    Ok(())
}
