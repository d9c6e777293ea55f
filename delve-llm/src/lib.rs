//! Delve LLM - Model invocation layer
//!
//! Integrates with siumai to call Anthropic, OpenRouter, OpenAI and Ollama
//! behind a single `ChatProvider` seam, with token budgeting, bounded retry,
//! provider fallback and streaming.

pub mod invocation;
pub mod llm_client;
pub mod provider;
pub mod token_counter;
pub mod types;

pub use invocation::*;
pub use llm_client::*;
pub use provider::*;
pub use token_counter::*;
pub use types::*;
