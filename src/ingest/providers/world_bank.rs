// src/ingest/providers/world_bank.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::Html;

use super::fetch::{absolutize, selector, text_of, PageFetcher};
use super::SUMMARY_MAX_CHARS;
use crate::ingest::deadline::find_long_date;
use crate::ingest::types::{RawNotice, SourceConnector};
use crate::ingest::truncate_chars;

pub const WB_ORIGIN: &str = "https://projects.worldbank.org";
pub const WB_SEARCH_URL: &str =
    "https://projects.worldbank.org/en/projects-operations/procurement";

fn country_name(code: &str) -> String {
    match code {
        "IL" => "Israel".to_string(),
        "AO" => "Angola".to_string(),
        "CI" => "Côte d’Ivoire".to_string(),
        other => other.to_string(),
    }
}

/// World Bank procurement notices, one query per ISO country code.
pub struct WorldBankConnector {
    fetcher: Arc<dyn PageFetcher>,
    query: String,
    country_codes: Vec<String>,
}

impl WorldBankConnector {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            query: "evaluation".to_string(),
            country_codes: vec!["IL".into(), "AO".into(), "CI".into()],
        }
    }

    pub fn with_country_codes(mut self, codes: Vec<String>) -> Self {
        self.country_codes = codes;
        self
    }

    pub fn parse_page(html: &str, code: &str) -> Vec<RawNotice> {
        let doc = Html::parse_document(html);
        let cards = selector(".wb-card, .search-result");
        let link_sel = selector("a");

        doc.select(&cards)
            .map(|card| {
                let link = card.select(&link_sel).next();
                let snippet = text_of(card);
                RawNotice {
                    source: "World Bank".to_string(),
                    title: link.map(text_of).unwrap_or_default(),
                    url: link
                        .and_then(|e| e.value().attr("href"))
                        .map(|h| absolutize(WB_ORIGIN, h)),
                    issuer: "World Bank".to_string(),
                    country: Some(country_name(code)),
                    deadline: find_long_date(&snippet),
                    summary: truncate_chars(&snippet, SUMMARY_MAX_CHARS),
                    full_text: None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl SourceConnector for WorldBankConnector {
    async fn fetch(&self) -> Result<Vec<RawNotice>> {
        let mut out = Vec::new();
        let mut failures = 0usize;
        for code in &self.country_codes {
            let query = [("searchTerm", self.query.as_str()), ("countrycode", code.as_str())];
            match self.fetcher.get(WB_SEARCH_URL, &query).await {
                Ok(html) => out.extend(Self::parse_page(&html, code)),
                Err(e) => {
                    tracing::warn!(error = ?e, connector = "World Bank", %code, "sub-query failed");
                    failures += 1;
                }
            }
        }
        if failures > 0 && failures == self.country_codes.len() {
            return Err(anyhow!("all {failures} World Bank queries failed"));
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "World Bank"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_cards_and_maps_country() {
        let html = r#"
<div class="wb-card">
  <a href="/en/procurement/notice/OP0001">Impact evaluation consultancy</a>
  <p>Deadline 30 January 2026. Estimated 120000 USD.</p>
</div>
<div class="search-result"><p>No link here</p></div>"#;
        let items = WorldBankConnector::parse_page(html, "CI");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Impact evaluation consultancy");
        assert_eq!(
            items[0].url.as_deref(),
            Some("https://projects.worldbank.org/en/procurement/notice/OP0001")
        );
        assert_eq!(items[0].country.as_deref(), Some("Côte d’Ivoire"));
        assert_eq!(items[0].deadline, NaiveDate::from_ymd_opt(2026, 1, 30));
        assert_eq!(items[1].title, "");
        assert_eq!(items[1].url, None);
        assert_eq!(country_name("KE"), "KE");
    }
}
