// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fx::{Confidence, ConvertedAmount};
use crate::money::MoneyAmount;
use crate::relevance::ScoreInput;

/// A notice as a connector scraped it, before any normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawNotice {
    pub source: String, // e.g., "UNGM", "World Bank"
    pub title: String,
    pub url: Option<String>,
    pub issuer: String,
    pub country: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub summary: String,
    pub full_text: Option<String>,
}

/// Final ranked record handed to the export boundary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Opportunity {
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub issuer: String,
    pub country: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub summary: String,
    pub full_text: Option<String>,
    pub budget_value: Option<f64>,
    pub budget_currency: Option<String>,
    /// Amount in the reference currency (ILS in the deployed profile).
    pub budget_ils: Option<f64>,
    pub budget_confidence: Confidence,
    pub fit_score: u8,
}

impl Opportunity {
    /// Attach budget fields to a raw notice. `fit_score` starts at 0.
    pub fn from_raw(raw: RawNotice, money: MoneyAmount, converted: ConvertedAmount) -> Self {
        Self {
            source: raw.source,
            title: raw.title,
            url: raw.url,
            issuer: raw.issuer,
            country: raw.country,
            deadline: raw.deadline,
            summary: raw.summary,
            full_text: raw.full_text,
            budget_value: money.value,
            budget_currency: money.currency,
            budget_ils: converted.amount,
            budget_confidence: converted.confidence,
            fit_score: 0,
        }
    }

    pub fn score_input(&self) -> ScoreInput<'_> {
        ScoreInput {
            title: &self.title,
            summary: &self.summary,
            full_text: self.full_text.as_deref(),
            country: self.country.as_deref(),
            issuer: &self.issuer,
            budget_ils: self.budget_ils,
            budget_confidence: self.budget_confidence,
        }
    }
}

/// One public data source. Implementations should swallow partial failures
/// (a single failed sub-query) and only return `Err` when nothing usable
/// came back.
#[async_trait::async_trait]
pub trait SourceConnector: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawNotice>>;
    fn name(&self) -> &'static str;
}
