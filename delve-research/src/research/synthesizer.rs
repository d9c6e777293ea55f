//! Report synthesis: corpus and question to one model-written report

use super::corpus::{BLOCK_SEPARATOR, RESULTS_MARKER};
use super::templates::{report_prompt, QUALITY_DIRECTIVES, RESEARCH_SYSTEM_PROMPT};
use super::types::ReportType;
use delve_core::{Message, ModelCallRequest, ResearchSettings};
use delve_llm::ModelInvoker;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};

/// Appended whenever the corpus is cut to fit the budget
pub const CORPUS_TRUNCATION_MARKER: &str = "\n[TRUNCATED DUE TO TOKEN LIMITS]";

/// Cap `corpus` at `max_chars` characters
///
/// The cut moves back to the last block boundary when that boundary lies
/// beyond three quarters of the budget; otherwise it is a hard cut.
pub fn cap_corpus(corpus: &str, max_chars: usize) -> Cow<'_, str> {
    let Some((cut, _)) = corpus.char_indices().nth(max_chars) else {
        return Cow::Borrowed(corpus);
    };

    let prefix = &corpus[..cut];
    let boundary = [BLOCK_SEPARATOR, RESULTS_MARKER]
        .iter()
        .filter_map(|marker| prefix.rfind(marker))
        .max();

    let kept = match boundary {
        Some(at) if prefix[..at].chars().count() * 4 > max_chars * 3 => &prefix[..at],
        _ => prefix,
    };

    warn!(
        "Truncating research data from {} chars to {} chars",
        corpus.chars().count(),
        kept.chars().count()
    );
    Cow::Owned(format!("{}{}", kept, CORPUS_TRUNCATION_MARKER))
}

/// Writes the final report with a single model call
pub struct ReportSynthesizer {
    invoker: Arc<ModelInvoker>,
    corpus_char_budget: usize,
    max_output_tokens: u32,
    temperature: f32,
}

impl ReportSynthesizer {
    pub fn new(invoker: Arc<ModelInvoker>, settings: &ResearchSettings, temperature: f32) -> Self {
        Self {
            invoker,
            corpus_char_budget: settings.corpus_char_budget(),
            max_output_tokens: settings.report_max_tokens,
            temperature,
        }
    }

    /// Render the full report prompt with the capped corpus and the quality
    /// directives
    pub fn build_prompt(
        &self,
        question: &str,
        corpus: &str,
        report_type: ReportType,
        extra_instructions: &str,
    ) -> String {
        let corpus = cap_corpus(corpus, self.corpus_char_budget);
        let mut prompt = report_prompt(report_type, question, &corpus, extra_instructions);
        prompt.push_str(QUALITY_DIRECTIVES);
        prompt
    }

    /// Write the report; returns the model text verbatim, or the apology text
    /// when every provider failed
    pub async fn synthesize(
        &self,
        question: &str,
        corpus: &str,
        report_type: ReportType,
        extra_instructions: &str,
    ) -> String {
        info!("Synthesizing {} for: {}", report_type, question);

        let prompt = self.build_prompt(question, corpus, report_type, extra_instructions);
        let request = ModelCallRequest::new(
            vec![Message::system(RESEARCH_SYSTEM_PROMPT), Message::user(prompt)],
            self.temperature,
        )
        .with_max_output_tokens(self.max_output_tokens);

        self.invoker.complete(&request, None).await
    }
}
