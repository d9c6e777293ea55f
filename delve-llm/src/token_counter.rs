//! Token estimation and prompt budgeting
//!
//! Uses tiktoken-rs for models with a known encoding and a four-characters-per-
//! token estimate for everything else (Claude models included).

use delve_core::{LlmSettings, Message, Role};
use std::sync::OnceLock;
use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer};
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Marker appended to a user message cut to fit the token ceiling
pub const TOKEN_LIMIT_MARKER: &str = " [TRUNCATED FOR TOKEN LIMIT]";

/// Characters assumed per token when no encoding is known
pub const CHARS_PER_TOKEN: usize = 4;

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

/// Cached encoder for the model, if tiktoken knows its encoding
fn encoder_for(model: &str) -> Option<&'static CoreBPE> {
    match get_tokenizer(model)? {
        Tokenizer::Cl100kBase => CL100K
            .get_or_init(|| {
                tiktoken_rs::cl100k_base()
                    .map_err(|e| warn!("Failed to load cl100k_base encoding: {}", e))
                    .ok()
            })
            .as_ref(),
        Tokenizer::O200kBase => O200K
            .get_or_init(|| {
                tiktoken_rs::o200k_base()
                    .map_err(|e| warn!("Failed to load o200k_base encoding: {}", e))
                    .ok()
            })
            .as_ref(),
        _ => None,
    }
}

/// Estimate the token count of `text` for `model`
pub fn count_tokens(text: &str, model: &str) -> usize {
    match encoder_for(model) {
        Some(encoder) => encoder.encode_with_special_tokens(text).len(),
        None => text.chars().count() / CHARS_PER_TOKEN,
    }
}

/// Estimate the token count of a whole conversation
pub fn count_message_tokens(messages: &[Message], model: &str) -> usize {
    messages
        .iter()
        .map(|message| count_tokens(&message.content, model))
        .sum()
}

/// Whether the model belongs to a large-context family
pub fn is_high_capacity(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    ["gpt-4", "gpt-5", "claude", "anthropic."]
        .iter()
        .any(|family| model.starts_with(family))
}

/// Prompt token ceilings by model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub standard: usize,
    pub high_capacity: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            standard: 3000,
            high_capacity: 160_000,
        }
    }
}

impl From<&LlmSettings> for TokenBudget {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            standard: settings.standard_token_ceiling,
            high_capacity: settings.high_capacity_token_ceiling,
        }
    }
}

impl TokenBudget {
    pub fn ceiling_for(&self, model: &str) -> usize {
        if is_high_capacity(model) {
            self.high_capacity
        } else {
            self.standard
        }
    }

    /// Character length a truncated message is cut to
    pub fn safe_length_for(&self, model: &str) -> usize {
        self.ceiling_for(model) * CHARS_PER_TOKEN
    }

    /// Truncate the final user message when the conversation exceeds the
    /// model's ceiling
    ///
    /// Returns true when a message was shortened. Only the last user message
    /// is touched. It is cut to the safe length first, then shortened further
    /// until the conversation estimate fits the ceiling.
    pub fn fit_messages(&self, messages: &mut [Message], model: &str) -> bool {
        let ceiling = self.ceiling_for(model);
        let tokens = count_message_tokens(messages, model);
        if tokens <= ceiling {
            return false;
        }

        let Some(last_user) = messages.iter_mut().rev().find(|m| m.role == Role::User) else {
            return false;
        };

        let original_chars = last_user.content.chars().count();
        let other_tokens = tokens.saturating_sub(count_tokens(&last_user.content, model));
        let mut limit = self.safe_length_for(model).min(original_chars);

        let truncated = loop {
            let candidate = truncate_for_token_limit(&last_user.content, limit);
            if limit == 0 || other_tokens + count_tokens(&candidate, model) <= ceiling {
                break candidate;
            }
            limit = limit * 3 / 4;
        };

        if truncated.chars().count() >= original_chars {
            warn!(
                model = model,
                tokens = tokens,
                ceiling = ceiling,
                "Prompt exceeds token ceiling but the last user message is too short to cut"
            );
            return false;
        }

        warn!(
            model = model,
            tokens = tokens,
            ceiling = ceiling,
            "Prompt exceeds token ceiling, truncating last user message"
        );
        last_user.content = truncated;
        true
    }
}

/// Cut `text` to `safe_length` characters, back off to the last sentence end
/// and append the token-limit marker
pub fn truncate_for_token_limit(text: &str, safe_length: usize) -> String {
    let cut = text
        .char_indices()
        .nth(safe_length)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    let mut truncated = &text[..cut];

    if let Some(end) = truncated.rfind(['.', '!', '?']) {
        if end > 0 {
            truncated = &truncated[..=end];
        }
    }

    debug!(
        original_chars = text.chars().count(),
        kept_chars = truncated.chars().count(),
        "Truncated message for token limit"
    );

    format!("{}{}", truncated, TOKEN_LIMIT_MARKER)
}
