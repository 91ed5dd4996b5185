// src/ingest/mod.rs
pub mod deadline;
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::config::PipelineConfig;
use crate::fx::{Confidence, CurrencyNormalizer, HttpRateSource, RateSource};
use crate::ingest::types::{Opportunity, RawNotice, SourceConnector};
use crate::money::{extract_money, MoneyAmount};
use crate::relevance::RelevanceScorer;

/// One-time metrics registration (so series show up in the exporter).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "radar_connector_records_total",
            "Raw notices returned by connectors."
        );
        describe_counter!(
            "radar_connector_errors_total",
            "Connector calls that failed or timed out."
        );
        describe_counter!("radar_fx_lookups_total", "Exchange-rate lookups issued.");
        describe_counter!("radar_fx_failures_total", "Exchange-rate lookups that failed.");
        describe_counter!("radar_dropped_total", "Notices discarded, by reason.");
        describe_counter!("radar_kept_total", "Notices kept after filtering.");
        describe_histogram!("radar_run_duration_ms", "Pipeline run time in milliseconds.");
        describe_gauge!("radar_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Normalize scraped text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace (incl. NBSP, which `\s` covers)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Cut to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Why a notice did not make it into the ranked output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No budget and too little text to judge.
    InsufficientText,
    /// Known reference-currency budget under the minimum.
    BelowMinimum,
    /// Title + summary hold none of the relevance keywords.
    NoKeyword,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::InsufficientText => "insufficient_text",
            DropReason::BelowMinimum => "below_minimum",
            DropReason::NoKeyword => "no_keyword",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub insufficient_text: usize,
    pub below_minimum: usize,
    pub no_keyword: usize,
}

impl DropCounts {
    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::InsufficientText => self.insufficient_text += 1,
            DropReason::BelowMinimum => self.below_minimum += 1,
            DropReason::NoKeyword => self.no_keyword += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.insufficient_text + self.below_minimum + self.no_keyword
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Ranked by `fit_score`, highest first.
    pub opportunities: Vec<Opportunity>,
    pub raw_count: usize,
    pub connectors_failed: usize,
    pub dropped: DropCounts,
}

/// Call every connector concurrently, each under its own timeout.
/// Returns notices in connector order plus the number of failed connectors.
pub async fn collect_raw(
    connectors: &[Arc<dyn SourceConnector>],
    timeout: Duration,
) -> (Vec<RawNotice>, usize) {
    let mut set = JoinSet::new();
    for (idx, c) in connectors.iter().enumerate() {
        let c = Arc::clone(c);
        set.spawn(async move {
            let res = tokio::time::timeout(timeout, c.fetch()).await;
            (idx, c.name(), res)
        });
    }

    let mut slots: Vec<Vec<RawNotice>> = vec![Vec::new(); connectors.len()];
    let mut failed = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, name, Ok(Ok(notices)))) => {
                counter!("radar_connector_records_total", "connector" => name)
                    .increment(notices.len() as u64);
                tracing::debug!(target: "ingest", connector = name, count = notices.len(), "connector ok");
                slots[idx] = notices;
            }
            Ok((_, name, Ok(Err(e)))) => {
                tracing::warn!(target: "ingest", error = ?e, connector = name, "connector error");
                counter!("radar_connector_errors_total", "connector" => name).increment(1);
                failed += 1;
            }
            Ok((_, name, Err(_))) => {
                tracing::warn!(target: "ingest", connector = name, ?timeout, "connector timed out");
                counter!("radar_connector_errors_total", "connector" => name).increment(1);
                failed += 1;
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "connector task aborted");
                counter!("radar_connector_errors_total", "connector" => "unknown").increment(1);
                failed += 1;
            }
        }
    }

    (slots.into_iter().flatten().collect(), failed)
}

/// Money from the summary, falling back to the full text.
fn extract_budget(notice: &RawNotice) -> MoneyAmount {
    let money = extract_money(&notice.summary);
    if money.is_found() {
        return money;
    }
    notice
        .full_text
        .as_deref()
        .map(extract_money)
        .unwrap_or_default()
}

/// Normalize, filter and score a single notice.
pub async fn process_notice(
    notice: RawNotice,
    cfg: &PipelineConfig,
    scorer: &RelevanceScorer,
    normalizer: &CurrencyNormalizer<'_>,
) -> Result<Opportunity, DropReason> {
    let money = extract_budget(&notice);
    let converted = normalizer.convert(&money).await;
    let mut op = Opportunity::from_raw(notice, money, converted);

    // A zero amount carries no more information than a missing one.
    let resolved = op.budget_ils.filter(|v| *v != 0.0);
    if resolved.is_none() {
        let narrative = format!("{} {}", op.summary, op.title);
        if word_count(&narrative) < cfg.min_words_without_budget {
            return Err(DropReason::InsufficientText);
        }
        op.budget_ils = None;
        op.budget_confidence = Confidence::Low;
    }

    if let Some(v) = op.budget_ils {
        if v < cfg.min_budget {
            return Err(DropReason::BelowMinimum);
        }
    }

    if !scorer.has_keyword(&format!("{} {}", op.title, op.summary)) {
        return Err(DropReason::NoKeyword);
    }

    op.fit_score = scorer.score(&op.score_input()).score;
    Ok(op)
}

/// Run the whole pipeline once against `rates` for currency lookups.
pub async fn run_once(
    connectors: &[Arc<dyn SourceConnector>],
    cfg: &PipelineConfig,
    scorer: &RelevanceScorer,
    rates: &dyn RateSource,
) -> RunReport {
    ensure_metrics_described();
    let t0 = Instant::now();

    let (raw, connectors_failed) = collect_raw(connectors, cfg.connector_timeout()).await;
    let raw_count = raw.len();

    // Fresh normalizer per run: rate memoization never outlives the run.
    let normalizer = CurrencyNormalizer::new(&cfg.reference_currency, rates);
    let mut kept = Vec::with_capacity(raw.len());
    let mut dropped = DropCounts::default();
    for notice in raw {
        match process_notice(notice, cfg, scorer, &normalizer).await {
            Ok(op) => kept.push(op),
            Err(reason) => {
                counter!("radar_dropped_total", "reason" => reason.as_str()).increment(1);
                dropped.record(reason);
            }
        }
    }

    // Stable: equal scores keep connector/record order.
    kept.sort_by(|a, b| b.fit_score.cmp(&a.fit_score));

    // Telemetry
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    counter!("radar_kept_total").increment(kept.len() as u64);
    histogram!("radar_run_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("radar_last_run_ts").set(now as f64);

    tracing::info!(
        target: "ingest",
        raw = raw_count,
        kept = kept.len(),
        dropped = dropped.total(),
        connectors_failed,
        reference = normalizer.reference(),
        "pipeline run finished"
    );

    RunReport {
        opportunities: kept,
        raw_count,
        connectors_failed,
        dropped,
    }
}

/// `run_once` with the HTTP rate service described by `cfg`.
pub async fn run_with_http_rates(
    connectors: &[Arc<dyn SourceConnector>],
    cfg: &PipelineConfig,
    scorer: &RelevanceScorer,
) -> anyhow::Result<RunReport> {
    let rates = HttpRateSource::new(&cfg.fx_api_base, cfg.fx_api_key.clone(), cfg.fx_timeout())?;
    Ok(run_once(connectors, cfg, scorer, &rates).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::RateError;
    use async_trait::async_trait;

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

    fn notice(summary: &str) -> RawNotice {
        RawNotice {
            source: "Test".into(),
            title: "Baseline study".into(),
            issuer: "Ministry of Education".into(),
            summary: summary.into(),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <p>Suivi&nbsp;&amp; <b>évaluation</b></p>\n\n Côte d’Ivoire ";
        assert_eq!(normalize_text(s), "Suivi & évaluation Côte d’Ivoire");
    }

    #[test]
    fn truncate_and_count() {
        assert_eq!(truncate_chars("évaluation", 3), "éva");
        assert_eq!(word_count("  one two\tthree\n"), 3);
    }

    #[tokio::test]
    async fn failed_conversion_falls_back_to_text_length() {
        let cfg = PipelineConfig::default();
        let scorer = RelevanceScorer::default();
        let rates = NoRates;
        let n = CurrencyNormalizer::new("ILS", &rates);

        let short = notice("Budget USD 90,000 for a baseline.");
        assert_eq!(
            process_notice(short, &cfg, &scorer, &n).await,
            Err(DropReason::InsufficientText)
        );

        let long = notice(&format!("Budget USD 90,000 for a baseline. {}", "word ".repeat(130)));
        let op = process_notice(long, &cfg, &scorer, &n).await.expect("kept");
        assert_eq!(op.budget_ils, None);
        assert_eq!(op.budget_confidence, Confidence::Low);
        assert_eq!(op.budget_value, Some(90000.0));
        assert_eq!(op.budget_currency.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn amount_in_full_text_is_used_when_summary_has_none() {
        let cfg = PipelineConfig::default();
        let scorer = RelevanceScorer::default();
        let rates = NoRates;
        let n = CurrencyNormalizer::new("ILS", &rates);

        let mut raw = notice("Baseline survey for youth employment.");
        raw.full_text = Some("Estimated value: NIS 250,000".into());
        let op = process_notice(raw, &cfg, &scorer, &n).await.expect("kept");
        assert_eq!(op.budget_ils, Some(250000.0));
        assert_eq!(op.budget_confidence, Confidence::High);
        assert!(op.fit_score > 0);
    }

    #[tokio::test]
    async fn minimum_and_keyword_gates() {
        let cfg = PipelineConfig::default();
        let scorer = RelevanceScorer::default();
        let rates = NoRates;
        let n = CurrencyNormalizer::new("ILS", &rates);

        let cheap = notice("Baseline for ILS 19,999.99");
        assert_eq!(
            process_notice(cheap, &cfg, &scorer, &n).await,
            Err(DropReason::BelowMinimum)
        );

        let exact = notice("Baseline for ILS 20,000");
        assert!(process_notice(exact, &cfg, &scorer, &n).await.is_ok());

        let mut off_topic = notice("Office furniture, ILS 500,000");
        off_topic.title = "Furniture tender".into();
        assert_eq!(
            process_notice(off_topic, &cfg, &scorer, &n).await,
            Err(DropReason::NoKeyword)
        );
    }

    #[test]
    fn drop_counts_total() {
        let mut d = DropCounts::default();
        d.record(DropReason::NoKeyword);
        d.record(DropReason::NoKeyword);
        d.record(DropReason::BelowMinimum);
        assert_eq!(d.no_keyword, 2);
        assert_eq!(d.total(), 3);
    }
}
