// tests/metrics_run.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tender_radar::telemetry::Metrics;
use tender_radar::{
    run_once, PipelineConfig, RateError, RateSource, RawNotice, RelevanceScorer, SourceConnector,
};

struct OneNotice;

#[async_trait]
impl SourceConnector for OneNotice {
    async fn fetch(&self) -> Result<Vec<RawNotice>> {
        Ok(vec![
            RawNotice {
                source: "One".into(),
                title: "Endline evaluation".into(),
                summary: "Endline survey, ILS 120,000".into(),
                ..Default::default()
            },
            RawNotice {
                source: "One".into(),
                title: "Cleaning services".into(),
                summary: "ILS 90,000".into(),
                ..Default::default()
            },
        ])
    }
    fn name(&self) -> &'static str {
        "One"
    }
}

struct Down;

#[async_trait]
impl SourceConnector for Down {
    async fn fetch(&self) -> Result<Vec<RawNotice>> {
        Err(anyhow!("503"))
    }
    fn name(&self) -> &'static str {
        "Down"
    }
}

struct NoRates;

#[async_trait]
impl RateSource for NoRates {
    async fn rate(&self, _b: &str, _t: &str) -> Result<f64, RateError> {
        Err(RateError::Status(503))
    }
    fn name(&self) -> &'static str {
        "none"
    }
}

// Single test per binary: the recorder is process-global.
#[tokio::test]
async fn run_emits_radar_series() {
    let m = Metrics::init().expect("recorder");

    let connectors: Vec<Arc<dyn SourceConnector>> = vec![Arc::new(OneNotice), Arc::new(Down)];
    let report = run_once(
        &connectors,
        &PipelineConfig::default(),
        &RelevanceScorer::default(),
        &NoRates,
    )
    .await;
    assert_eq!(report.opportunities.len(), 1);

    let text = m.render();
    assert!(text.contains("radar_connector_records_total"), "{text}");
    assert!(text.contains("radar_connector_errors_total"), "{text}");
    assert!(text.contains("radar_dropped_total"), "{text}");
    assert!(text.contains("no_keyword"), "{text}");
    assert!(text.contains("radar_kept_total 1"), "{text}");
    assert!(text.contains("radar_last_run_ts"), "{text}");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.prom");
    m.write_snapshot(&path).unwrap();
    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.contains("radar_kept_total"));
}
