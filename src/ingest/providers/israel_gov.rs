// src/ingest/providers/israel_gov.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::Html;

use super::fetch::{absolutize, selector, text_of, PageFetcher};
use super::SUMMARY_MAX_CHARS;
use crate::ingest::deadline::find_dotted_date;
use crate::ingest::truncate_chars;
use crate::ingest::types::{RawNotice, SourceConnector};
use crate::relevance::RelevanceScorer;

pub const GOV_IL_ORIGIN: &str = "https://www.gov.il";
pub const GOV_IL_SEARCH_URL: &str = "https://www.gov.il/he/Search";

/// gov.il site search. Each hit is followed to its detail page, whose text
/// becomes the notice body.
pub struct IsraelGovConnector {
    fetcher: Arc<dyn PageFetcher>,
    gate: RelevanceScorer,
    terms: Vec<String>,
}

impl IsraelGovConnector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, gate: RelevanceScorer) -> Self {
        Self {
            fetcher,
            gate,
            // evaluation, measurement, evaluation research, consulting
            terms: vec![
                "הערכה".into(),
                "מדידה".into(),
                "מחקר הערכה".into(),
                "ייעוץ".into(),
            ],
        }
    }

    pub fn with_terms(mut self, terms: Vec<String>) -> Self {
        self.terms = terms;
        self
    }

    /// (title, absolute link) for every search hit that has a link.
    pub fn parse_results(html: &str) -> Vec<(String, String)> {
        let doc = Html::parse_document(html);
        let hits = selector("a.result");
        doc.select(&hits)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                Some((text_of(a), absolutize(GOV_IL_ORIGIN, href)))
            })
            .collect()
    }

    /// Build a notice from a detail page, or `None` when it is off-topic.
    pub fn parse_detail(&self, title: &str, link: &str, html: &str) -> Option<RawNotice> {
        let doc = Html::parse_document(html);
        let full = text_of(doc.root_element());
        if !self.gate.has_keyword(&format!("{title} {full}")) {
            return None;
        }
        Some(RawNotice {
            source: "Israel GOV".to_string(),
            title: title.to_string(),
            url: Some(link.to_string()),
            issuer: "Government of Israel".to_string(),
            country: Some("Israel".to_string()),
            deadline: find_dotted_date(&full),
            summary: truncate_chars(&full, SUMMARY_MAX_CHARS),
            full_text: Some(full),
        })
    }

    async fn search_term(&self, term: &str) -> Result<Vec<RawNotice>> {
        let html = self.fetcher.get(GOV_IL_SEARCH_URL, &[("q", term)]).await?;
        let mut out = Vec::new();
        for (title, link) in Self::parse_results(&html) {
            match self.fetcher.get_detail(&link).await {
                Ok(detail) => out.extend(self.parse_detail(&title, &link, &detail)),
                Err(e) => {
                    tracing::debug!(error = ?e, connector = "Israel GOV", %link, "detail page failed");
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceConnector for IsraelGovConnector {
    async fn fetch(&self) -> Result<Vec<RawNotice>> {
        let mut out = Vec::new();
        let mut failures = 0usize;
        for term in &self.terms {
            match self.search_term(term).await {
                Ok(v) => out.extend(v),
                Err(e) => {
                    tracing::warn!(error = ?e, connector = "Israel GOV", %term, "sub-query failed");
                    failures += 1;
                }
            }
        }
        if failures > 0 && failures == self.terms.len() {
            return Err(anyhow!("all {failures} gov.il searches failed"));
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "Israel GOV"
    }
}
