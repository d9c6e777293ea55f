//! Content fetching: URL to bounded clean text
//!
//! HTML pages are reduced to their main readable text with `scraper`; PDFs are
//! downloaded under a byte cap and extracted with `pdf-extract` on a blocking
//! worker with a deadline. Failures never propagate: they become placeholder
//! documents with `SourceKind::Error`.

use crate::ResearchResult;
use async_trait::async_trait;
use delve_core::{network_error, with_timeout, FetchSettings, FetchedDocument, SourceKind};
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tags whose subtrees never contribute text
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "meta", "link", "header", "aside",
];

pub const PDF_TOO_LARGE: &str = "[PDF too large - extraction skipped]";
pub const PDF_TIMEOUT: &str = "[PDF processing timeout - extraction aborted]";
pub const PDF_DOWNLOAD_TIMEOUT: &str = "[Connection timeout while downloading PDF]";
pub const PDF_TRUNCATION_MARKER: &str = "... [text truncated due to length]";

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `url` and return its cleaned text; never fails
    async fn fetch(&self, url: &str) -> FetchedDocument;
}

/// Heuristic PDF detection applied before any network call
///
/// Matches any URL containing "pdf", so query strings such as `?format=pdf`
/// or paths like `/pdfs/` are routed to the PDF path.
pub fn is_pdf_url(url: &str) -> bool {
    let url = url.to_lowercase();
    url.ends_with(".pdf") || url.contains("pdf")
}

/// Cap `text` at `max_chars`, cutting after the last sentence terminator
/// inside the cap when there is one
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> (String, bool) {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return (text.to_string(), false);
    };

    let head = &text[..cut];
    match head.rfind(['.', '!', '?']) {
        Some(end) if end > 0 => (head[..=end].to_string(), true),
        _ => (head.to_string(), true),
    }
}

/// Extract readable text from an HTML document
///
/// Noise tags are dropped, the first `<main>` or `<article>` is preferred over
/// `<body>`, text nodes are joined with newlines and blank lines removed.
pub fn extract_clean_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let content_root = Selector::parse("main, article")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .or_else(|| {
            Selector::parse("body")
                .ok()
                .and_then(|selector| document.select(&selector).next())
        })
        .unwrap_or_else(|| document.root_element());

    let mut fragments = Vec::new();
    collect_text(content_root, &mut fragments);

    fragments
        .join("\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, fragments: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    fragments.push(text.to_string());
                }
            }
            Node::Element(el) => {
                if SKIPPED_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, fragments);
                }
            }
            _ => {}
        }
    }
}

/// Join the first `max_pages` pages and note how many were omitted
pub fn limit_pdf_pages(pages: &[String], max_pages: usize) -> String {
    let total = pages.len();
    let shown = total.min(max_pages);
    let mut text = pages[..shown].concat();

    if shown < total {
        text.push_str(&format!(
            "\n\n[Note: Only showing first {} of {} pages]",
            shown, total
        ));
    }

    text
}

/// Cap extracted PDF text at `max_chars` including the truncation marker
pub fn cap_pdf_text(text: String, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text, false);
    }

    let keep = max_chars.saturating_sub(PDF_TRUNCATION_MARKER.chars().count());
    let mut capped: String = text.chars().take(keep).collect();
    capped.push_str(PDF_TRUNCATION_MARKER);
    (capped, true)
}

fn extract_pdf_pages(bytes: &[u8], max_pages: usize) -> Result<String, String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())?;
    Ok(limit_pdf_pages(&pages, max_pages))
}

/// Run a blocking extraction on a worker thread under a deadline
///
/// On expiry the worker's result is discarded. `Err` carries the placeholder
/// text for the failed document.
pub async fn extract_with_deadline<F>(extract: F, deadline_ms: u64) -> Result<String, String>
where
    F: FnOnce() -> Result<String, String> + Send + 'static,
{
    let worker = tokio::task::spawn_blocking(extract);

    match with_timeout(worker, deadline_ms, "pdf_extraction").await {
        Ok(Ok(Ok(text))) => Ok(text),
        Ok(Ok(Err(e))) => Err(format!("[PDF extraction error: {}]", e)),
        Ok(Err(join_error)) => Err(format!("[PDF processing error: {}]", join_error)),
        Err(_) => Err(PDF_TIMEOUT.to_string()),
    }
}

/// HTTP-backed fetcher for HTML pages and PDFs
pub struct HttpContentFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl HttpContentFetcher {
    pub fn new(settings: &FetchSettings) -> ResearchResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|e| {
                network_error!(format!("Failed to build HTTP client: {}", e), "fetcher", e)
            })?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    async fn fetch_html(&self, url: &str) -> FetchedDocument {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return FetchedDocument::error(url, format!("Request timed out for: {}", url));
            }
            Err(e) => return FetchedDocument::error(url, format!("Network error: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchedDocument::error(
                url,
                format!("Network error: HTTP {} for url ({})", status, url),
            );
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) if e.is_timeout() => {
                return FetchedDocument::error(url, format!("Request timed out for: {}", url));
            }
            Err(e) => return FetchedDocument::error(url, format!("Processing error: {}", e)),
        };

        let text = extract_clean_text(&html);
        let (text, truncated) = truncate_at_sentence(&text, self.settings.html_max_chars);

        debug!(url = url, chars = text.len(), truncated = truncated, "Fetched HTML page");
        FetchedDocument::new(url, SourceKind::Html, text, truncated)
    }

    /// Download a PDF under the byte cap; `Err` carries the placeholder text
    async fn download_pdf(&self, url: &str) -> Result<Vec<u8>, String> {
        let download_error = |e: reqwest::Error| {
            if e.is_timeout() {
                PDF_DOWNLOAD_TIMEOUT.to_string()
            } else {
                format!("[Network error: {}]", e)
            }
        };

        let mut response = self
            .client
            .get(url)
            .header(ACCEPT, "application/pdf,*/*")
            .timeout(Duration::from_secs(self.settings.pdf_download_timeout_secs))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(download_error)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("application/pdf") && !url.to_lowercase().ends_with(".pdf") {
            return Err(format!("[Not a PDF: {}]", content_type));
        }

        let declared_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        if declared_length.is_some_and(|length| length > self.settings.pdf_max_bytes) {
            return Err(PDF_TOO_LARGE.to_string());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(download_error)? {
            if bytes.len() + chunk.len() > self.settings.pdf_max_bytes {
                return Err(PDF_TOO_LARGE.to_string());
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }

    async fn fetch_pdf(&self, url: &str) -> FetchedDocument {
        let bytes = match self.download_pdf(url).await {
            Ok(bytes) => bytes,
            Err(placeholder) => {
                warn!(url = url, reason = %placeholder, "PDF download skipped");
                return FetchedDocument::error(url, placeholder);
            }
        };

        let max_pages = self.settings.pdf_max_pages;
        let deadline_ms = self.settings.pdf_extraction_timeout_secs * 1000;
        let extract = move || extract_pdf_pages(&bytes, max_pages);
        let text = match extract_with_deadline(extract, deadline_ms).await {
            Ok(text) => text,
            Err(placeholder) => {
                warn!(url = url, reason = %placeholder, "PDF extraction failed");
                return FetchedDocument::error(url, placeholder);
            }
        };

        let (text, truncated) = cap_pdf_text(text, self.settings.pdf_max_chars);
        info!(url = url, chars = text.len(), truncated = truncated, "Extracted PDF text");
        FetchedDocument::new(url, SourceKind::Pdf, text, truncated)
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> FetchedDocument {
        if is_pdf_url(url) {
            self.fetch_pdf(url).await
        } else {
            self.fetch_html(url).await
        }
    }
}
