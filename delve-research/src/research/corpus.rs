//! Research corpus assembly
//!
//! The corpus is an append-only list of blocks. Each query block keeps the
//! query it came from so provenance survives until the corpus is joined.

use delve_core::{ResearchQuery, SearchResult};
use std::fmt::Write;

/// Separator closing every query block
pub const BLOCK_SEPARATOR: &str = "================\n";
/// Marker opening the search results of a query block
pub const RESULTS_MARKER: &str = "=Search Result=:\n";

/// One block of the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusBlock {
    /// Originating query; `None` for headers
    pub query: Option<ResearchQuery>,
    pub text: String,
}

/// Append-only corpus under construction
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    blocks: Vec<CorpusBlock>,
}

impl CorpusBuilder {
    /// Start a corpus with the main question header
    pub fn new(question: &str) -> Self {
        Self {
            blocks: vec![CorpusBlock {
                query: None,
                text: format!("=== MAIN QUESTION: {} ===\n\n", question),
            }],
        }
    }

    /// Open the subtopic exploration section
    pub fn push_subtopic_section(&mut self) {
        self.push_header("\n\n=== SUBTOPIC EXPLORATION ===\n\n".to_string());
    }

    pub fn push_subtopic_header(&mut self, title: &str) {
        self.push_header(format!("\n== SUBTOPIC: {} ==\n\n", title));
    }

    fn push_header(&mut self, text: String) {
        self.blocks.push(CorpusBlock { query: None, text });
    }

    /// Append the block for one query and its (enriched) results
    pub fn push_query(&mut self, query: &ResearchQuery, results: &[SearchResult]) {
        self.blocks.push(CorpusBlock {
            query: Some(query.clone()),
            text: render_query_block(&query.text, results),
        });
    }

    pub fn blocks(&self) -> &[CorpusBlock] {
        &self.blocks
    }

    /// Number of query blocks appended so far
    pub fn query_block_count(&self) -> usize {
        self.blocks.iter().filter(|block| block.query.is_some()).count()
    }

    /// Join every block into the final corpus string
    pub fn finalize(self) -> String {
        self.blocks.into_iter().map(|block| block.text).collect()
    }
}

fn render_query_block(query: &str, results: &[SearchResult]) -> String {
    let mut text = format!("=Query=:\n{}\n{}", query, RESULTS_MARKER);

    if results.is_empty() {
        text.push_str("No results found.\n\n");
    }

    for (index, result) in results.iter().enumerate() {
        match result {
            SearchResult::Hit(hit) => {
                let content = hit.clean_text().unwrap_or("[Content not retrieved]");
                let _ = write!(
                    text,
                    "[{}] {}\nURL: {}\nSnippet: {}\nContent:\n{}\n\n",
                    index + 1,
                    hit.title,
                    hit.url,
                    hit.snippet,
                    content
                );
            }
            SearchResult::Failed(failure) => {
                let _ = write!(
                    text,
                    "[{}] {} (query: {})\n\n",
                    index + 1,
                    failure.error,
                    failure.query
                );
            }
        }
    }

    text.push_str(BLOCK_SEPARATOR);
    text
}
