//! Delve CLI - Command-line interface for Delve
//!
//! Research questions on the web, ask the assistant directly, inspect query
//! plans and manage configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use delve_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, DelveConfig,
    DelveError, LoggingConfig, ProviderKind,
};
use delve_research::{ReportType, ResearchEngine};
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "delve")]
#[command(about = "An AI research assistant that searches the web and writes reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a question on the web and write a report
    Research {
        /// Question to research
        question: String,

        /// Report type ("Research Report", "Resource Report", "Outline Report", "Deep Research")
        #[arg(short, long, default_value = "Research Report")]
        report_type: String,

        /// Extra instructions for the report writer
        #[arg(short, long)]
        extra: Option<String>,

        /// Also explore model-proposed subtopics
        #[arg(long)]
        subtopics: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask the assistant directly, without web research
    Ask {
        /// Question to ask
        query: String,

        /// Primary model provider (anthropic, openrouter, openai, ollama)
        #[arg(short, long)]
        provider: Option<String>,

        /// Print the answer as it is generated
        #[arg(short, long)]
        stream: bool,
    },

    /// Show the search queries planned for a question
    Plan {
        /// Question to plan
        question: String,

        /// Plan subtopics instead of flat queries
        #[arg(long)]
        subtopics: bool,
    },

    /// Manage configuration
    Config {
        /// Show current configuration (API keys masked)
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config = LoggingConfig::verbose();
    }
    if let Some(level) = &cli.log_level {
        logging_config.level = level.clone();
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting Delve CLI v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { show, init, force } => {
            handle_config(config_path, show, init, force)?;
        }
        Commands::Research {
            question,
            report_type,
            extra,
            subtopics,
            output,
        } => {
            let mut config = load_config(config_path)?;
            config.research.explore_subtopics |= subtopics;
            let engine = build_engine(&config)?;
            let report_type = ReportType::from_name(&report_type);
            handle_research(&engine, &question, report_type, extra.as_deref(), output.as_deref())
                .await?;
        }
        Commands::Ask {
            query,
            provider,
            stream,
        } => {
            let provider = provider
                .as_deref()
                .map(str::parse::<ProviderKind>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let engine = build_engine(&load_config(config_path)?)?;
            handle_ask(&engine, &query, provider, stream).await?;
        }
        Commands::Plan {
            question,
            subtopics,
        } => {
            let engine = build_engine(&load_config(config_path)?)?;
            handle_plan(&engine, &question, subtopics).await;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DelveConfig> {
    if let Some(path) = path {
        info!("Loading configuration from {}", path.display());
    }
    DelveConfig::load(path)
        .inspect_err(DelveError::log)
        .context("Failed to load configuration")
}

fn build_engine(config: &DelveConfig) -> Result<ResearchEngine> {
    let engine = ResearchEngine::new(config).context("Failed to build research engine")?;
    if engine.invoker().available_providers().is_empty() {
        eprintln!("⚠️  No model provider is configured.");
        eprintln!("   Set ANTHROPIC_API_KEY, OPENROUTER_API_KEY, OPENAI_API_KEY or OLLAMA_HOST.");
    }
    Ok(engine)
}

async fn handle_research(
    engine: &ResearchEngine,
    question: &str,
    report_type: ReportType,
    extra: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    log_operation_start!("research", report_type = %report_type);
    println!("🔬 Researching: {}", question);
    println!("📄 Report type: {}", report_type);

    let report = engine
        .research(question, report_type, extra.unwrap_or(""))
        .await
        .map_err(|e| {
            log_operation_error!("research", e);
            e
        })?;

    println!("🔎 Searched {} queries:", report.queries.len());
    for query in &report.queries {
        match &query.subtopic {
            Some(subtopic) => println!("   - [{}] {}", subtopic, query.text),
            None => println!("   - {}", query.text),
        }
    }
    println!("📚 Corpus: {} characters", report.corpus_chars);

    match output {
        Some(path) => {
            std::fs::write(path, &report.report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Report written to {}", path.display());
        }
        None => println!("\n{}", report.report),
    }

    log_operation_success!("research", corpus_chars = report.corpus_chars);
    Ok(())
}

/// Part of `snapshot` not yet printed
fn unseen_suffix<'a>(printed: &str, snapshot: &'a str) -> &'a str {
    snapshot
        .strip_prefix(printed)
        .unwrap_or(snapshot)
}

async fn handle_ask(
    engine: &ResearchEngine,
    query: &str,
    provider: Option<ProviderKind>,
    stream: bool,
) -> Result<()> {
    if !stream {
        println!("{}", engine.ask(query, provider).await);
        return Ok(());
    }

    let mut snapshots = engine.ask_stream(query, provider);
    let mut printed = String::new();
    let mut stdout = std::io::stdout();

    while let Some(snapshot) = snapshots.next().await {
        stdout.write_all(unseen_suffix(&printed, &snapshot).as_bytes())?;
        stdout.flush()?;
        printed = snapshot;
    }
    println!();

    Ok(())
}

async fn handle_plan(engine: &ResearchEngine, question: &str, subtopics: bool) {
    if subtopics {
        for subtopic in engine.plan_subtopics(question).await {
            println!("📌 {} ({})", subtopic.title, subtopic.id);
            for query in &subtopic.queries {
                println!("   - {}", query);
            }
        }
    } else {
        for query in engine.plan(question).await {
            println!("{}: {}", query.id, query.text);
        }
    }
}

fn handle_config(path: Option<&Path>, show: bool, init: bool, force: bool) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(DelveConfig::default_path);

    if init {
        if config_path.exists() && !force {
            anyhow::bail!(
                "Configuration already exists at {} (use --force to overwrite)",
                config_path.display()
            );
        }
        DelveConfig::default().save_to_file(&config_path)?;
        println!("✅ Configuration initialized at: {}", config_path.display());
        println!("📝 API keys are read from the environment or a .env file.");
    }

    if show {
        let config = load_config(path)?;
        println!("📋 Current configuration:");
        println!("{}", toml::to_string_pretty(&config.redacted())?);
    }

    if !init && !show {
        println!("Configuration file: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_args() {
        let cli = Cli::parse_from([
            "delve",
            "research",
            "Does remote work raise productivity?",
            "--report-type",
            "Outline Report",
            "--subtopics",
            "--config",
            "delve.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("delve.toml")));
        match cli.command {
            Commands::Research {
                question,
                report_type,
                subtopics,
                output,
                ..
            } => {
                assert_eq!(question, "Does remote work raise productivity?");
                assert_eq!(ReportType::from_name(&report_type), ReportType::Outline);
                assert!(subtopics);
                assert!(output.is_none());
            }
            _ => panic!("expected research command"),
        }
    }

    #[test]
    fn test_ask_args() {
        let cli = Cli::parse_from(["delve", "--log-level", "debug", "ask", "hi", "-p", "ollama", "--stream"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Ask {
                provider, stream, ..
            } => {
                assert_eq!(provider.as_deref(), Some("ollama"));
                assert!(stream);
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn test_unseen_suffix() {
        assert_eq!(unseen_suffix("", "Hello"), "Hello");
        assert_eq!(unseen_suffix("Hello", "Hello world"), " world");
        assert_eq!(unseen_suffix("Other", "Hello"), "Hello");
    }
}
