//! Article fetching and readable-text extraction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::{Result, WorkerError};

/// Source of article text for a URL.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Fetch the page at `url` and return its readable text.
    async fn fetch_article_text(&self, url: &str) -> Result<String>;
}

/// Configuration for [`HttpArticleFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum response size in bytes.
    pub max_body_bytes: usize,
    /// Maximum extracted text length in bytes.
    pub max_text_length: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_body_bytes: 10 * 1024 * 1024,
            max_text_length: 100_000,
            user_agent: concat!("precis/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches articles over HTTP(S) and extracts paragraph text from the HTML.
#[derive(Debug, Clone)]
pub struct HttpArticleFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpArticleFetcher {
    /// Create a fetcher with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(FetchOptions::default())
    }

    /// Create a fetcher with custom options.
    pub fn with_options(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| WorkerError::fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_article_text(&self, url: &str) -> Result<String> {
        let url = parse_article_url(url)?;
        debug!(%url, "Fetching article");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| WorkerError::fetch(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let msg = format!("{} returned HTTP {}", url, status);
            // 408 and 429 are the client errors a later attempt can clear
            let permanent = status.is_client_error()
                && status != StatusCode::REQUEST_TIMEOUT
                && status != StatusCode::TOO_MANY_REQUESTS;
            return Err(if permanent {
                WorkerError::rejected(msg)
            } else {
                WorkerError::fetch(msg)
            });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.options.max_body_bytes
        {
            return Err(WorkerError::rejected(format!(
                "{} is too large ({} bytes, limit {})",
                url, len, self.options.max_body_bytes
            )));
        }

        // Decodes with the charset from Content-Type, falling back to UTF-8
        let html = response
            .text()
            .await
            .map_err(|e| WorkerError::fetch(format!("failed to read {}: {}", url, e)))?;
        if html.len() > self.options.max_body_bytes {
            return Err(WorkerError::rejected(format!(
                "{} is too large ({} bytes, limit {})",
                url,
                html.len(),
                self.options.max_body_bytes
            )));
        }

        let text = extract_article_text(&html, self.options.max_text_length);
        if text.is_empty() {
            return Err(WorkerError::rejected(format!("no readable text at {}", url)));
        }

        debug!(%url, chars = text.chars().count(), "Article fetched");
        Ok(text)
    }
}

/// Parse `url`, accepting only http and https.
pub fn parse_article_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| WorkerError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(WorkerError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, scheme
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

const CONTENT_PARAGRAPHS: &[&str] = &["article p", "main p", "[role='main'] p"];
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extract readable text from an HTML document.
///
/// Prefers paragraphs inside the main content area, then every paragraph,
/// then the whole body. Whitespace is collapsed and the result is capped at
/// `max_len` bytes on a char boundary.
pub fn extract_article_text(html: &str, max_len: usize) -> String {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for selector in CONTENT_PARAGRAPHS {
        text = select_text(&document, selector);
        if !text.is_empty() {
            break;
        }
    }
    if text.is_empty() {
        text = select_text(&document, "p");
    }
    if text.is_empty() {
        text = select_text(&document, "body");
    }

    truncate_on_char_boundary(text, max_len)
}

fn select_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };

    let parts: Vec<String> = document
        .select(&selector)
        .map(visible_text)
        .filter(|t| !t.is_empty())
        .collect();
    parts.join(" ")
}

/// Text under `element`, skipping script-like subtrees, whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace().map(str::to_string));
        }
    }
    words.join(" ")
}

fn truncate_on_char_boundary(mut text: String, max_len: usize) -> String {
    if text.len() > max_len {
        let mut end = max_len;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.truncate(text.trim_end().len());
    }
    text
}
