//! External information sources: web search and content fetching

pub mod fetcher;
pub mod search;

pub use fetcher::{
    cap_pdf_text, extract_clean_text, is_pdf_url, limit_pdf_pages, truncate_at_sentence,
    ContentFetcher, HttpContentFetcher,
};
pub use search::{SearchProvider, SearxngSearch};
