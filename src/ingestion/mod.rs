//! Loaders that turn external sources into [`Document`]s.
//!
//! [`load_url`] fetches a page, extracts its visible text, and produces a
//! document ready for the engine. A [`PageCache`] can be supplied so
//! repeated ingestions of the same URL read from disk instead of the
//! network.
//!
//! PDF extraction stays with the caller: hand the engine pre-extracted text
//! as [`Document`]s and the rest of the pipeline is shared.

use std::path::{Path, PathBuf};

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tokio::fs;
use tracing::debug;
use url::Url;

use crate::types::{Document, RagError};

/// Filesystem cache for downloaded pages, keyed by a sanitized form of the
/// URL path and query.
#[derive(Clone, Debug)]
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache file for `url`. Deterministic, so a later ingestion of the
    /// same URL maps to the same file.
    pub fn cache_path(&self, url: &Url) -> PathBuf {
        let mut name = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .map(sanitize_component)
            .collect::<Vec<_>>()
            .join("_");
        if name.is_empty() {
            name.push_str("index");
        }
        if let Some(query) = url.query() {
            name.push('_');
            name.push_str(&sanitize_component(query));
        }
        if Path::new(&name).extension().is_none() {
            name.push_str(".html");
        }
        self.root.join(name)
    }

    /// Returns the cached page for `url`, or `None` on a cache miss.
    pub async fn load(&self, url: &Url) -> Result<Option<String>, RagError> {
        let path = self.cache_path(url);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    /// Persists `content` as the cached page for `url`.
    pub async fn store(&self, url: &Url, content: &str) -> Result<(), RagError> {
        let path = self.cache_path(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;
        Ok(())
    }
}

/// Fetches `url` and extracts its visible text into a [`Document`].
///
/// With a cache, a hit skips the network entirely and a miss persists the
/// fetched page before returning.
pub async fn load_url(
    client: &Client,
    url: &Url,
    cache: Option<&PageCache>,
) -> Result<Document, RagError> {
    let html = match cache {
        Some(cache) => match cache.load(url).await? {
            Some(cached) => {
                debug!(%url, "serving page from cache");
                cached
            }
            None => {
                let fetched = fetch_html(client, url).await?;
                cache.store(url, &fetched).await?;
                fetched
            }
        },
        None => fetch_html(client, url).await?,
    };

    let text = html_to_text(&html);
    if text.trim().is_empty() {
        return Err(RagError::InvalidDocument(format!(
            "no text content extracted from {url}"
        )));
    }
    Ok(Document::new(url.to_string(), text))
}

async fn fetch_html(client: &Client, url: &Url) -> Result<String, RagError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Extracts the visible text of an HTML page.
///
/// Walks the body (falling back to the document root for fragments),
/// skipping script, style, and noscript subtrees. Whitespace is left for the
/// normalizer to collapse.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let scope = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    collect_text(scope, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(&text.text);
            out.push(' ');
        } else if let Some(el) = ElementRef::wrap(child) {
            if !matches!(el.value().name(), "script" | "style" | "noscript") {
                collect_text(el, out);
            }
        }
    }
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
