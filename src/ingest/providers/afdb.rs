// src/ingest/providers/afdb.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;

use super::fetch::{absolutize, selector, text_of, PageFetcher};
use super::SUMMARY_MAX_CHARS;
use crate::ingest::deadline::find_labelled_date;
use crate::ingest::truncate_chars;
use crate::ingest::types::{RawNotice, SourceConnector};
use crate::relevance::RelevanceScorer;

pub const AFDB_ORIGIN: &str = "https://www.afdb.org";
pub const AFDB_LIST_URL: &str = "https://www.afdb.org/en/projects-and-operations/procurement";

/// African Development Bank procurement listing. The page is not searchable,
/// so off-topic cards are dropped here with the keyword gate.
pub struct AfdbConnector {
    fetcher: Arc<dyn PageFetcher>,
    gate: RelevanceScorer,
}

impl AfdbConnector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, gate: RelevanceScorer) -> Self {
        Self { fetcher, gate }
    }

    pub fn parse_page(&self, html: &str) -> Vec<RawNotice> {
        let doc = Html::parse_document(html);
        let cards = selector(".views-row, .node--type-procurement-notice");
        let link_sel = selector("a");

        let mut out = Vec::new();
        for card in doc.select(&cards) {
            let link = card.select(&link_sel).next();
            let title = link.map(text_of).unwrap_or_default();
            let snippet = text_of(card);
            if !self.gate.has_keyword(&format!("{snippet} {title}")) {
                continue;
            }
            out.push(RawNotice {
                source: "AfDB".to_string(),
                title,
                url: link
                    .and_then(|e| e.value().attr("href"))
                    .map(|h| absolutize(AFDB_ORIGIN, h)),
                issuer: "African Development Bank".to_string(),
                country: None,
                deadline: find_labelled_date(&snippet),
                summary: truncate_chars(&snippet, SUMMARY_MAX_CHARS),
                full_text: None,
            });
        }
        out
    }
}

#[async_trait]
impl SourceConnector for AfdbConnector {
    async fn fetch(&self) -> Result<Vec<RawNotice>> {
        let html = self
            .fetcher
            .get(AFDB_LIST_URL, &[])
            .await
            .context("afdb listing")?;
        Ok(self.parse_page(&html))
    }

    fn name(&self) -> &'static str {
        "AfDB"
    }
}
