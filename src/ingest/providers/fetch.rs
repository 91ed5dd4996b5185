// src/ingest/providers/fetch.rs
//! Page retrieval shared by the HTML connectors: live HTTP in production,
//! canned pages in tests.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Selector};

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of `url` with `query` appended. Non-2xx responses are errors.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String>;

    /// Body of a single notice page reached from a listing.
    async fn get_detail(&self, url: &str) -> Result<String> {
        self.get(url, &[]).await
    }
}

/// The URL a fetcher will actually request, query string included.
pub fn page_url(url: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    match reqwest::Url::parse_with_params(url, query) {
        Ok(u) => u.to_string(),
        Err(_) => url.to_string(),
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    listing_timeout: Duration,
    detail_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(listing_timeout: Duration, detail_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tender-radar/0.1")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building connector http client")?;
        Ok(Self {
            client,
            listing_timeout,
            detail_timeout,
        })
    }

    async fn request(&self, url: &str, query: &[(&str, &str)], timeout: Duration) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} status"))?;
        resp.text().await.with_context(|| format!("GET {url} body"))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        self.request(url, query, self.listing_timeout).await
    }

    async fn get_detail(&self, url: &str) -> Result<String> {
        self.request(url, &[], self.detail_timeout).await
    }
}

/// Serves pages from memory, keyed by [`page_url`].
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, query: &[(&str, &str)], body: &str) -> Self {
        self.pages.insert(page_url(url, query), body.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let key = page_url(url, query);
        self.pages
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for {key}"))
    }
}

/* ---- small HTML helpers ---- */

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static css selector")
}

/// Normalized text content of an element.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    crate::ingest::normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Resolve `href` against `origin` (scheme + host, no trailing slash).
pub(crate) fn absolutize(origin: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}
