// tests/connectors_fixture.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tender_radar::ingest::providers::afdb::AFDB_LIST_URL;
use tender_radar::ingest::providers::default_connectors;
use tender_radar::ingest::providers::fetch::{FixtureFetcher, PageFetcher};
use tender_radar::ingest::providers::israel_gov::{IsraelGovConnector, GOV_IL_SEARCH_URL};
use tender_radar::{
    run_once, Confidence, PipelineConfig, RateError, RateSource, RelevanceScorer, SourceConnector,
};

struct EurRate;

#[async_trait]
impl RateSource for EurRate {
    async fn rate(&self, base: &str, _target: &str) -> Result<f64, RateError> {
        match base {
            "EUR" => Ok(4.0),
            other => Err(RateError::MissingRate(other.to_string())),
        }
    }
    fn name(&self) -> &'static str {
        "fixture"
    }
}

const AFDB_PAGE: &str = r#"
<html><body>
<div class="views-row">
  <a href="/en/documents/gpn-me-angola">GPN - Monitoring and evaluation of rural water programme, Angola</a>
  <span>Closing date: 12 March 2026. Estimated budget EUR 100,000</span>
</div>
<div class="views-row">
  <a href="/en/documents/works">Construction of a bridge</a>
  <span>Deadline: 1 April 2026. EUR 2,000,000</span>
</div>
</body></html>"#;

#[tokio::test]
async fn unreachable_portals_do_not_sink_the_run() {
    // Only the AfDB listing is served; every other portal request misses.
    let fetcher = Arc::new(FixtureFetcher::new().with_page(AFDB_LIST_URL, &[], AFDB_PAGE));
    let scorer = RelevanceScorer::default();
    let connectors = default_connectors(fetcher, &scorer);

    let report = run_once(&connectors, &PipelineConfig::default(), &scorer, &EurRate).await;

    assert_eq!(report.connectors_failed, connectors.len() - 1);
    assert_eq!(report.raw_count, 1, "bridge card is gated at the connector");
    assert_eq!(report.opportunities.len(), 1);

    let op = &report.opportunities[0];
    assert_eq!(op.source, "AfDB");
    assert_eq!(op.budget_currency.as_deref(), Some("EUR"));
    assert_eq!(op.budget_ils, Some(400000.0));
    assert_eq!(op.budget_confidence, Confidence::Medium);
    assert_eq!(
        op.url.as_deref(),
        Some("https://www.afdb.org/en/documents/gpn-me-angola")
    );
    // keyword 10 + Angola 30 + institution 10 + budget 10
    assert_eq!(op.fit_score, 60);
}

const GOV_RESULTS: &str = r#"
<ul>
  <li><a class="result" href="/he/tender-a">מכרז א</a></li>
  <li><a class="result" href="/he/tender-slow">מכרז ב</a></li>
  <li><a class="result" href="/he/tender-c">מכרז ג</a></li>
</ul>"#;

fn gov_detail(n: u32) -> String {
    format!("<html><body><p>Impact evaluation, lot {n}. Budget NIS 150,000.</p></body></html>")
}

/// Detail pages answer after `delay`; any page taking longer than
/// `per_request` fails the same way a timed-out HTTP request does.
struct SlowDetails {
    inner: FixtureFetcher,
    delay: Duration,
    slow_url: &'static str,
    per_request: Duration,
}

#[async_trait]
impl PageFetcher for SlowDetails {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> anyhow::Result<String> {
        self.inner.get(url, query).await
    }

    async fn get_detail(&self, url: &str) -> anyhow::Result<String> {
        let delay = if url == self.slow_url {
            Duration::from_secs(30)
        } else {
            self.delay
        };
        let fut = async {
            tokio::time::sleep(delay).await;
            self.inner.get_detail(url).await
        };
        tokio::time::timeout(self.per_request, fut)
            .await
            .map_err(|_| anyhow::anyhow!("GET {url} timed out"))?
    }
}

fn gov_connector(fetcher: SlowDetails) -> Arc<dyn SourceConnector> {
    Arc::new(
        IsraelGovConnector::new(Arc::new(fetcher), RelevanceScorer::default())
            .with_terms(vec!["הערכה".into()]),
    )
}

fn gov_pages() -> FixtureFetcher {
    FixtureFetcher::new()
        .with_page(GOV_IL_SEARCH_URL, &[("q", "הערכה")], GOV_RESULTS)
        .with_page("https://www.gov.il/he/tender-a", &[], &gov_detail(1))
        .with_page("https://www.gov.il/he/tender-slow", &[], &gov_detail(2))
        .with_page("https://www.gov.il/he/tender-c", &[], &gov_detail(3))
}

#[tokio::test]
async fn one_slow_detail_page_keeps_the_other_records() {
    let fetcher = SlowDetails {
        inner: gov_pages(),
        delay: Duration::from_millis(450),
        slow_url: "https://www.gov.il/he/tender-slow",
        per_request: Duration::from_millis(800),
    };
    let connectors = vec![gov_connector(fetcher)];

    let report = run_once(
        &connectors,
        &PipelineConfig::default(),
        &RelevanceScorer::default(),
        &EurRate,
    )
    .await;

    assert_eq!(report.connectors_failed, 0);
    assert_eq!(report.raw_count, 2);
    let urls: Vec<_> = report
        .opportunities
        .iter()
        .filter_map(|o| o.url.as_deref())
        .collect();
    assert_eq!(
        urls,
        vec!["https://www.gov.il/he/tender-a", "https://www.gov.il/he/tender-c"]
    );
}

#[tokio::test]
async fn slow_but_answering_details_fit_the_default_budget() {
    let fetcher = SlowDetails {
        inner: gov_pages(),
        delay: Duration::from_millis(450),
        slow_url: "",
        per_request: Duration::from_secs(5),
    };
    let connectors = vec![gov_connector(fetcher)];

    let report = run_once(
        &connectors,
        &PipelineConfig::default(),
        &RelevanceScorer::default(),
        &EurRate,
    )
    .await;

    assert_eq!(report.connectors_failed, 0);
    assert_eq!(report.raw_count, 3);
    assert_eq!(report.opportunities.len(), 3);
}

#[test]
fn request_timeouts_are_separate_from_the_connector_budget() {
    let cfg = PipelineConfig::default();
    assert_eq!(cfg.listing_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.detail_timeout(), Duration::from_secs(20));
    assert!(cfg.connector_timeout() > cfg.listing_timeout() * 4 + cfg.detail_timeout() * 4);
}
