//! Configuration management
//!
//! `DelveConfig` is built once at process entry (file, then environment) and
//! handed by reference to every component constructor.

use crate::error::{DelveError, DelveResult};
use crate::logging::LoggingConfig;
use crate::types::ProviderKind;
use crate::validation_error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DelveConfig {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub fetch: FetchSettings,
    pub research: ResearchSettings,
    pub server: ServerSettings,
    pub logging: LoggingConfig,
}

/// Model invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Primary provider when the caller does not name one
    pub default_provider: ProviderKind,
    /// Providers tried after the primary, in order
    pub fallback_order: Vec<ProviderKind>,
    pub temperature: f32,
    /// Attempts per provider before moving down the chain
    pub max_attempts: usize,
    /// Delay before the first retry; doubles each attempt
    pub retry_base_delay_ms: u64,
    pub standard_token_ceiling: usize,
    pub high_capacity_token_ceiling: usize,
    pub providers: ProvidersConfig,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::Anthropic,
            fallback_order: vec![
                ProviderKind::Anthropic,
                ProviderKind::OpenRouter,
                ProviderKind::OpenAi,
            ],
            temperature: 0.7,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            standard_token_ceiling: 3000,
            high_capacity_token_ceiling: 160_000,
            providers: ProvidersConfig::default(),
        }
    }
}

/// Per-provider credentials and defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub openai: ProviderConfig,
    pub ollama: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig::new("claude-3-7-sonnet-20250219"),
            openrouter: ProviderConfig::new("deepseek/deepseek-chat")
                .with_base_url("https://openrouter.ai/api/v1"),
            openai: ProviderConfig::new("gpt-4o-mini"),
            ollama: ProviderConfig::new("llama3.2").with_base_url("http://localhost:11434"),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Ollama => &self.ollama,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::OpenRouter => &mut self.openrouter,
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Ollama => &mut self.ollama,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default model id
    pub model: String,
}

impl ProviderConfig {
    pub fn new(model: &str) -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: model.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }
}

/// Search backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// SearXNG-compatible `/search` endpoint
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888/search".to_string(),
            timeout_secs: 10,
            max_results: 10,
        }
    }
}

/// Content fetcher bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub html_max_chars: usize,
    pub pdf_download_timeout_secs: u64,
    pub pdf_max_bytes: usize,
    pub pdf_max_pages: usize,
    pub pdf_max_chars: usize,
    pub pdf_extraction_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            html_max_chars: 5000,
            pdf_download_timeout_secs: 20,
            pdf_max_bytes: 10 * 1024 * 1024,
            pdf_max_pages: 50,
            pdf_max_chars: 50_000,
            pdf_extraction_timeout_secs: 15,
            user_agent: "Mozilla/5.0 (compatible; delve-research/0.1)".to_string(),
        }
    }
}

/// Research pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    pub max_queries: usize,
    pub max_subtopics: usize,
    pub max_queries_per_subtopic: usize,
    /// Run the subtopic exploration pass after the main queries
    pub explore_subtopics: bool,
    /// Throttle between successive URL fetches
    pub fetch_delay_ms: u64,
    pub corpus_token_budget: usize,
    pub chars_per_token: usize,
    pub planner_max_tokens: u32,
    pub report_max_tokens: u32,
    pub answer_max_tokens: u32,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_queries: 10,
            max_subtopics: 8,
            max_queries_per_subtopic: 3,
            explore_subtopics: false,
            fetch_delay_ms: 1000,
            corpus_token_budget: 150_000,
            chars_per_token: 4,
            planner_max_tokens: 1500,
            report_max_tokens: 8000,
            answer_max_tokens: 2500,
        }
    }
}

impl ResearchSettings {
    /// Character budget for the corpus embedded in the report prompt
    pub fn corpus_char_budget(&self) -> usize {
        self.corpus_token_budget * self.chars_per_token
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DelveConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DelveError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DelveConfig = toml::from_str(&content).map_err(|e| DelveError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DelveResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DelveError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DelveError::Config {
                    message: format!("Failed to create config directory: {}", e),
                    source: Some(Box::new(e)),
                    context: crate::ErrorContext::new("config").with_operation("create_dir"),
                })?;
            }
        }

        std::fs::write(path, content).map_err(|e| DelveError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Default location: `<config dir>/delve/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("delve")
            .join("config.toml")
    }

    /// Load from `path`, or from the default location if it exists, then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> DelveResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Copy with every API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for kind in ProviderKind::ALL {
            let provider = config.llm.providers.get_mut(kind);
            if provider.api_key.is_some() {
                provider.api_key = Some("********".to_string());
            }
        }
        config
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.llm.providers.anthropic.api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENROUTER_API_KEY") {
            self.llm.providers.openrouter.api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.providers.openai.api_key = Some(key);
        }
        if let Some(host) = non_empty("OLLAMA_HOST") {
            self.llm.providers.ollama.base_url = Some(host);
        }
        if let Some(url) = non_empty("SEARXNG_URL") {
            self.search.base_url = url;
        }
        if let Some(provider) = non_empty("DELVE_PROVIDER") {
            match provider.parse() {
                Ok(kind) => self.llm.default_provider = kind,
                Err(e) => tracing::warn!("Ignoring DELVE_PROVIDER: {}", e),
            }
        }
        if let Some(temperature) = non_empty("DELVE_TEMPERATURE") {
            match temperature.parse() {
                Ok(value) => self.llm.temperature = value,
                Err(_) => tracing::warn!("Ignoring invalid DELVE_TEMPERATURE: {}", temperature),
            }
        }
        if let Some(host) = non_empty("DELVE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("DELVE_PORT") {
            match port.parse() {
                Ok(value) => self.server.port = value,
                Err(_) => tracing::warn!("Ignoring invalid DELVE_PORT: {}", port),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> DelveResult<()> {
        if self.llm.max_attempts == 0 {
            return Err(validation_error!(
                "llm.max_attempts must be greater than 0",
                "llm.max_attempts",
                "config"
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(validation_error!(
                "llm.temperature must be between 0.0 and 2.0",
                "llm.temperature",
                "config",
                "Set llm.temperature to a value such as 0.7"
            ));
        }

        if self.search.max_results == 0 {
            return Err(validation_error!(
                "search.max_results must be greater than 0",
                "search.max_results",
                "config"
            ));
        }

        if url_scheme(&self.search.base_url).is_none() {
            return Err(validation_error!(
                "search.base_url must be an http(s) URL",
                "search.base_url",
                "config",
                "Point search.base_url at a SearXNG /search endpoint"
            ));
        }

        if self.fetch.html_max_chars == 0 {
            return Err(validation_error!(
                "fetch.html_max_chars must be greater than 0",
                "fetch.html_max_chars",
                "config"
            ));
        }

        if self.fetch.pdf_max_chars == 0 {
            return Err(validation_error!(
                "fetch.pdf_max_chars must be greater than 0",
                "fetch.pdf_max_chars",
                "config"
            ));
        }

        if self.research.max_queries == 0 {
            return Err(validation_error!(
                "research.max_queries must be greater than 0",
                "research.max_queries",
                "config"
            ));
        }

        if self.research.corpus_char_budget() == 0 {
            return Err(validation_error!(
                "research corpus budget must be greater than 0",
                "research.corpus_token_budget",
                "config",
                "Set research.corpus_token_budget and research.chars_per_token to positive values"
            ));
        }

        Ok(())
    }
}

fn url_scheme(url: &str) -> Option<&str> {
    ["https://", "http://"]
        .into_iter()
        .find(|scheme| url.starts_with(scheme))
}
