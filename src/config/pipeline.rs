// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG_PATH";
pub const ENV_BASE_CURRENCY: &str = "BASE_CURRENCY";
pub const ENV_MIN_BUDGET: &str = "MIN_BUDGET_ILS";
pub const ENV_FX_API_BASE: &str = "FX_API_BASE_URL";
pub const ENV_FX_API_KEY: &str = "FX_API_KEY";

/// Resolved settings the pipeline consumes. The core never reads the
/// environment itself; the binary resolves this once and passes it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// ISO code every budget is normalized into.
    pub reference_currency: String,
    /// Known reference-currency budgets below this are dropped.
    pub min_budget: f64,
    /// Budget-less notices need at least this many words of title + summary.
    pub min_words_without_budget: usize,
    pub fx_api_base: String,
    pub fx_api_key: Option<String>,
    pub fx_timeout_secs: u64,
    /// Per-request bound on search and listing pages.
    pub listing_timeout_secs: u64,
    /// Per-request bound on notice detail pages.
    pub detail_timeout_secs: u64,
    /// Backstop for a whole connector run. Much larger than any single
    /// request; hitting it discards that connector's records.
    pub connector_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_currency: "ILS".to_string(),
            min_budget: 20_000.0,
            min_words_without_budget: 120,
            fx_api_base: "https://api.exchangerate.host".to_string(),
            fx_api_key: None,
            fx_timeout_secs: 20,
            listing_timeout_secs: 30,
            detail_timeout_secs: 20,
            connector_timeout_secs: 600,
        }
    }
}

impl PipelineConfig {
    pub fn fx_timeout(&self) -> Duration {
        Duration::from_secs(self.fx_timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn connector_timeout(&self) -> Duration {
        Duration::from_secs(self.connector_timeout_secs)
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply environment overrides:
    /// 1) $RADAR_CONFIG_PATH
    /// 2) config/radar.toml
    /// 3) config/radar.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_overrides(|k| std::env::var(k).ok());
        Ok(cfg.sanitized())
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/radar.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/radar.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Override fields from `lookup` (normally the process environment).
    /// Unparsable numbers are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BASE_CURRENCY).filter(|v| !v.trim().is_empty()) {
            self.reference_currency = v;
        }
        if let Some(v) = lookup(ENV_MIN_BUDGET) {
            match v.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => self.min_budget = n,
                _ => tracing::warn!(value = %v, "ignoring unparsable {ENV_MIN_BUDGET}"),
            }
        }
        if let Some(v) = lookup(ENV_FX_API_BASE).filter(|v| !v.trim().is_empty()) {
            self.fx_api_base = v;
        }
        if let Some(v) = lookup(ENV_FX_API_KEY) {
            self.fx_api_key = Some(v);
        }
    }

    fn sanitized(mut self) -> Self {
        self.reference_currency = self.reference_currency.trim().to_ascii_uppercase();
        if self.reference_currency.is_empty() {
            self.reference_currency = Self::default().reference_currency;
        }
        self.fx_api_key = self.fx_api_key.filter(|k| !k.trim().is_empty());
        self.fx_timeout_secs = self.fx_timeout_secs.max(1);
        self.listing_timeout_secs = self.listing_timeout_secs.max(1);
        self.detail_timeout_secs = self.detail_timeout_secs.max(1);
        self.connector_timeout_secs = self.connector_timeout_secs.max(1);
        self
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported pipeline config format: {toml_err}")),
    }
}
