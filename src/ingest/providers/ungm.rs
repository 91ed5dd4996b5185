// src/ingest/providers/ungm.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::Html;

use super::fetch::{absolutize, selector, text_of, PageFetcher};
use super::SUMMARY_MAX_CHARS;
use crate::ingest::deadline::parse_deadline;
use crate::ingest::types::{RawNotice, SourceConnector};
use crate::ingest::{normalize_text, truncate_chars};

pub const UNGM_ORIGIN: &str = "https://www.ungm.org";
pub const UNGM_SEARCH_URL: &str = "https://www.ungm.org/Public/Notice";

/// UN Global Marketplace notice search, one query per country.
pub struct UngmConnector {
    fetcher: Arc<dyn PageFetcher>,
    query: String,
    countries: Vec<String>,
}

impl UngmConnector {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            query: "evaluation".to_string(),
            countries: vec!["Israel".into(), "Angola".into(), "Côte d’Ivoire".into()],
        }
    }

    pub fn with_countries(mut self, countries: Vec<String>) -> Self {
        self.countries = countries;
        self
    }

    /// Parse one search result page.
    pub fn parse_page(html: &str, country: &str) -> Vec<RawNotice> {
        let doc = Html::parse_document(html);
        let rows = selector(".search-result-row");
        let title_sel = selector(".notice-title");
        let agency_sel = selector(".agency-name");
        let date_sel = selector(".notice-deadline, .notice-date");

        let mut out = Vec::new();
        for row in doc.select(&rows) {
            let title_el = row.select(&title_sel).next();
            let title = title_el.map(text_of).unwrap_or_default();
            let url = title_el
                .and_then(|e| e.value().attr("href"))
                .map(|h| absolutize(UNGM_ORIGIN, h));
            let issuer = row
                .select(&agency_sel)
                .next()
                .map(text_of)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "United Nations".to_string());
            let deadline = row
                .select(&date_sel)
                .find_map(|e| parse_deadline(&text_of(e), true));
            let snippet = normalize_text(&row.text().collect::<Vec<_>>().join(" "));

            out.push(RawNotice {
                source: "UNGM".to_string(),
                title,
                url,
                issuer,
                country: Some(country.to_string()),
                deadline,
                summary: truncate_chars(&snippet, SUMMARY_MAX_CHARS),
                full_text: None,
            });
        }
        out
    }
}

#[async_trait]
impl SourceConnector for UngmConnector {
    async fn fetch(&self) -> Result<Vec<RawNotice>> {
        let mut out = Vec::new();
        let mut failures = 0usize;
        for country in &self.countries {
            let query = [("Country", country.as_str()), ("searchText", self.query.as_str())];
            match self.fetcher.get(UNGM_SEARCH_URL, &query).await {
                Ok(html) => out.extend(Self::parse_page(&html, country)),
                Err(e) => {
                    tracing::warn!(error = ?e, connector = "UNGM", %country, "sub-query failed");
                    failures += 1;
                }
            }
        }
        if failures > 0 && failures == self.countries.len() {
            return Err(anyhow!("all {failures} UNGM queries failed"));
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "UNGM"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::fetch::FixtureFetcher;
    use chrono::NaiveDate;

    const PAGE: &str = r#"
<div class="search-results">
  <div class="search-result-row">
    <a class="notice-title" href="/Public/Notice/1234">Final evaluation of youth programme</a>
    <span class="agency-name">UNICEF</span>
    <span class="notice-deadline">15-Dec-2025 17:00 (GMT 1.00)</span>
    <p>Budget USD 40,000. Baseline and endline surveys.</p>
  </div>
  <div class="search-result-row">
    <a class="notice-title">Supply of vehicles</a>
    <span class="notice-date">not a date</span>
  </div>
</div>"#;

    #[test]
    fn parses_rows() {
        let items = UngmConnector::parse_page(PAGE, "Angola");
        assert_eq!(items.len(), 2);

        let a = &items[0];
        assert_eq!(a.source, "UNGM");
        assert_eq!(a.title, "Final evaluation of youth programme");
        assert_eq!(a.url.as_deref(), Some("https://www.ungm.org/Public/Notice/1234"));
        assert_eq!(a.issuer, "UNICEF");
        assert_eq!(a.country.as_deref(), Some("Angola"));
        assert_eq!(a.deadline, NaiveDate::from_ymd_opt(2025, 12, 15));
        assert!(a.summary.contains("USD 40,000"));

        let b = &items[1];
        assert_eq!(b.url, None);
        assert_eq!(b.issuer, "United Nations");
        assert_eq!(b.deadline, None);
    }

    #[tokio::test]
    async fn one_failing_country_is_skipped() {
        let f = FixtureFetcher::new().with_page(
            UNGM_SEARCH_URL,
            &[("Country", "Angola"), ("searchText", "evaluation")],
            PAGE,
        );
        let c = UngmConnector::new(Arc::new(f))
            .with_countries(vec!["Angola".into(), "Israel".into()]);
        let items = c.fetch().await.expect("partial success");
        assert_eq!(items.len(), 2);

        let none = UngmConnector::new(Arc::new(FixtureFetcher::new()));
        assert!(none.fetch().await.is_err());
    }
}
