// src/fx.rs
//! Currency normalization into the reference currency.
//!
//! `CurrencyNormalizer` never fails: a missing amount is `Unknown`, an amount
//! already in the reference currency is `High`, a successful live conversion
//! is `Medium` and any lookup failure collapses into `Low` with no amount.
//! Successful lookups are memoized per (base, target) pair for the lifetime
//! of one normalizer, which the pipeline creates once per run. Failed
//! lookups are retried on the next record.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::money::MoneyAmount;

/// Trust in a converted amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        }
    }

    /// High and medium amounts count toward the budget bonus.
    pub fn is_trusted(&self) -> bool {
        matches!(self, Confidence::High | Confidence::Medium)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvertedAmount {
    pub amount: Option<f64>,
    pub confidence: Confidence,
}

impl ConvertedAmount {
    pub fn unknown() -> Self {
        Self {
            amount: None,
            confidence: Confidence::Unknown,
        }
    }

    pub fn failed() -> Self {
        Self {
            amount: None,
            confidence: Confidence::Low,
        }
    }
}

/// Why a rate lookup did not produce a usable number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Transport(String),
    #[error("rate request timed out after {0:?}")]
    Timeout(Duration),
    #[error("rate service returned HTTP {0}")]
    Status(u16),
    #[error("malformed rate response: {0}")]
    Malformed(String),
    #[error("no {0} rate in response")]
    MissingRate(String),
    #[error("unusable rate value {0}")]
    InvalidRate(f64),
}

/// External exchange-rate lookup.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `target` per one unit of `base`.
    async fn rate(&self, base: &str, target: &str) -> Result<f64, RateError>;
    fn name(&self) -> &'static str;
}

/// `GET {base_url}/latest?base=XXX&symbols=YYY` against an
/// exchangerate.host-compatible service.
pub struct HttpRateSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpRateSource {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tender-radar/0.1")
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| anyhow::anyhow!("building fx http client: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    fn map_transport(&self, e: reqwest::Error) -> RateError {
        if e.is_timeout() {
            RateError::Timeout(self.timeout)
        } else {
            RateError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn rate(&self, base: &str, target: &str) -> Result<f64, RateError> {
        let url = format!("{}/latest", self.base_url);
        let mut req = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .query(&[("base", base), ("symbols", target)]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("api_key", key.as_str())]);
        }

        let resp = req.send().await.map_err(|e| self.map_transport(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        parse_rate_body(&body, target)
    }

    fn name(&self) -> &'static str {
        "exchangerate-http"
    }
}

/// Read `rates[target]` out of a `/latest` response body.
pub fn parse_rate_body(body: &str, target: &str) -> Result<f64, RateError> {
    let v: serde_json::Value =
        serde_json::from_str(body).map_err(|e| RateError::Malformed(e.to_string()))?;
    let rates = v
        .get("rates")
        .and_then(|r| r.as_object())
        .ok_or_else(|| RateError::Malformed("missing `rates` object".into()))?;
    let target = target.to_ascii_uppercase();
    let rate = rates
        .get(&target)
        .and_then(|x| x.as_f64())
        .ok_or(RateError::MissingRate(target))?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateError::InvalidRate(rate));
    }
    Ok(rate)
}

/// Converts extracted amounts into the reference currency.
pub struct CurrencyNormalizer<'a> {
    reference: String,
    source: &'a dyn RateSource,
    cache: Mutex<HashMap<(String, String), f64>>,
}

impl<'a> CurrencyNormalizer<'a> {
    pub fn new(reference: &str, source: &'a dyn RateSource) -> Self {
        Self {
            reference: reference.trim().to_ascii_uppercase(),
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub async fn convert(&self, money: &MoneyAmount) -> ConvertedAmount {
        let (value, currency) = match (money.value, money.currency.as_deref()) {
            (Some(v), Some(c)) => (v, c.trim().to_ascii_uppercase()),
            _ => return ConvertedAmount::unknown(),
        };

        if currency == self.reference {
            return ConvertedAmount {
                amount: Some(value),
                confidence: Confidence::High,
            };
        }

        match self.lookup(&currency).await {
            Ok(rate) => ConvertedAmount {
                amount: Some(value * rate),
                confidence: Confidence::Medium,
            },
            Err(e) => {
                tracing::debug!(
                    target: "fx",
                    error = %e,
                    source = self.source.name(),
                    base = %currency,
                    quote = %self.reference(),
                    "conversion failed"
                );
                ConvertedAmount::failed()
            }
        }
    }

    // The lock is held across the lookup so a pair is fetched at most once
    // while it keeps succeeding.
    async fn lookup(&self, base: &str) -> Result<f64, RateError> {
        let key = (base.to_string(), self.reference.clone());
        let mut cache = self.cache.lock().await;
        if let Some(rate) = cache.get(&key) {
            return Ok(*rate);
        }
        counter!("radar_fx_lookups_total").increment(1);
        match self.source.rate(base, &self.reference).await {
            Ok(rate) => {
                cache.insert(key, rate);
                Ok(rate)
            }
            Err(e) => {
                counter!("radar_fx_failures_total").increment(1);
                Err(e)
            }
        }
    }
}
