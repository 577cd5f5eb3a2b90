//! Turning user input into article text
//!
//! Plain text passes through untouched (trimmed). URLs are fetched and the
//! readable part of the page is pulled out: first with a readability pass,
//! then, when that finds too little, with a list of selectors that commonly
//! wrap article bodies.

use std::io::Cursor;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::clients::PageFetcher;
use crate::errors::SummarizeError;
use crate::utils::links::{is_http_url, normalize_url};
use crate::utils::text::{collapse_whitespace, tidy_lines, word_count};

/// A readability result must beat this many words to be trusted; shorter
/// output is usually a cookie banner or footer.
pub const MIN_READABLE_WORDS: usize = 60;

/// Containers tried in order when readability comes up short.
pub const READABLE_SELECTORS: [&str; 20] = [
    "article",
    "main",
    "[role=main]",
    "#content",
    ".content",
    ".content-body",
    ".article",
    ".article-body",
    ".article-content",
    ".knowledge-article",
    ".knowledgeArticle",
    ".slds-rich-text-editor__output",
    ".slds-rich-text-area",
    ".slds-rich-text-editor__textarea",
    ".post-content",
    ".entry-content",
    ".prose",
    ".c-article__content",
    "#article-body",
    "#main-content",
];

/// Elements that never hold article text.
const NOISE_SELECTOR: &str = "script, style, noscript, nav, footer, header, aside, form";

// Wide enough that html2text does not hard-wrap paragraphs.
const RENDER_WIDTH: usize = 10_000;

static COMPILED_READABLE: Lazy<Vec<Selector>> = Lazy::new(|| {
    READABLE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static COMPILED_NOISE: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse(NOISE_SELECTOR).ok());

/// Fetch `input` if it is an `http(s)` URL and return its main text;
/// otherwise return the input trimmed.
pub async fn fetch_if_url(fetcher: &dyn PageFetcher, input: &str) -> Result<String, SummarizeError> {
    let trimmed = input.trim();
    if !is_http_url(trimmed) {
        return Ok(trimmed.to_string());
    }
    fetch_article(fetcher, trimmed).await
}

/// Fetch `raw_url` and return the main text of the page.
pub async fn fetch_article(fetcher: &dyn PageFetcher, raw_url: &str) -> Result<String, SummarizeError> {
    let url = normalize_url(raw_url)
        .ok_or_else(|| SummarizeError::HttpError(format!("Invalid URL: {}", raw_url.trim())))?;
    let html = fetcher.fetch_html(&url).await?;
    let text = extract_main_text(&html, &url);
    info!(url = %url, words = word_count(&text), "Extracted article text");
    Ok(text)
}

/// Best-effort readable text of an HTML page.
#[must_use]
pub fn extract_main_text(html: &str, url: &Url) -> String {
    match extract_with_readability(html, url) {
        Ok(text) if word_count(&text) > MIN_READABLE_WORDS => text,
        Ok(text) => {
            debug!(words = word_count(&text), "Readability output too short, using selectors");
            extract_with_selectors(html)
        }
        Err(e) => {
            warn!(error = %e, "Readability extraction failed, using selectors");
            extract_with_selectors(html)
        }
    }
}

/// Readability article extraction rendered to plain text with line breaks
/// kept.
pub fn extract_with_readability(html: &str, url: &Url) -> Result<String, SummarizeError> {
    let mut cursor = Cursor::new(html.as_bytes());
    let product = readability::extractor::extract(&mut cursor, url)
        .map_err(|e| SummarizeError::ExtractionError(e.to_string()))?;

    let rendered = html2text::config::plain_no_decorate()
        .string_from_read(product.content.as_bytes(), RENDER_WIDTH)
        .map_err(|e| SummarizeError::ExtractionError(e.to_string()))?;
    Ok(tidy_lines(&rendered))
}

/// Text of the first readable container with any content, or of the whole
/// page, after dropping navigation and script noise. Whitespace is collapsed
/// to single spaces.
#[must_use]
pub fn extract_with_selectors(html: &str) -> String {
    let mut document = Html::parse_document(html);

    if let Some(noise) = COMPILED_NOISE.as_ref() {
        let noisy: Vec<_> = document.select(noise).map(|el| el.id()).collect();
        for id in noisy {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    for selector in COMPILED_READABLE.iter() {
        if let Some(node) = document.select(selector).next()
            && node.text().any(|t| !t.trim().is_empty())
        {
            return collapse_whitespace(&element_text(node));
        }
    }

    collapse_whitespace(&element_text(document.root_element()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
