//! Tender Radar binary entrypoint.
//! Runs every connector once, ranks the results and writes a CSV (or JSON
//! Lines) export.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tender_radar::export::{export_file_name, write_file, ExportFormat};
use tender_radar::ingest::providers::{default_connectors, fetch::HttpFetcher};
use tender_radar::ingest::run_with_http_rates;
use tender_radar::telemetry::{init_tracing, Metrics};
use tender_radar::{PipelineConfig, RelevanceScorer, ScoringProfile};

const ENV_OUT_DIR: &str = "RADAR_OUT_DIR";
const ENV_METRICS_PATH: &str = "RADAR_METRICS_PATH";
const ENV_EXPORT_FORMAT: &str = "RADAR_EXPORT_FORMAT";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match std::env::var(ENV_METRICS_PATH) {
        Ok(p) => Some((Metrics::init()?, PathBuf::from(p))),
        Err(_) => None,
    };

    let cfg = PipelineConfig::load_default()?;
    let format = match std::env::var(ENV_EXPORT_FORMAT) {
        Ok(v) => v.parse::<ExportFormat>()?,
        Err(_) => ExportFormat::default(),
    };
    let scorer = RelevanceScorer::new(&ScoringProfile::from_toml()?);
    info!(
        reference = %cfg.reference_currency,
        min_budget = cfg.min_budget,
        "starting opportunity scan"
    );

    let fetcher = Arc::new(HttpFetcher::new(
        cfg.listing_timeout(),
        cfg.detail_timeout(),
    )?);
    let connectors = default_connectors(fetcher, &scorer);
    let report = run_with_http_rates(&connectors, &cfg, &scorer).await?;

    let out_dir = std::env::var(ENV_OUT_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let path = out_dir.join(export_file_name(chrono::Utc::now(), format));
    let written = write_file(&path, &report.opportunities, format)?;
    info!(
        count = written,
        connectors_failed = report.connectors_failed,
        path = %path.display(),
        "saved opportunities"
    );

    if let Some((m, p)) = metrics {
        m.write_snapshot(&p)?;
    }
    Ok(())
}
