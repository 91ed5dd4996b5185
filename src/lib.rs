// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod export;
pub mod fx;
pub mod ingest;
pub mod money;
pub mod relevance;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::PipelineConfig;
pub use crate::fx::{Confidence, ConvertedAmount, CurrencyNormalizer, RateError, RateSource};
pub use crate::ingest::types::{Opportunity, RawNotice, SourceConnector};
pub use crate::ingest::{run_once, RunReport};
pub use crate::money::{extract_money, MoneyAmount};
pub use crate::relevance::{Relevance, RelevanceScorer, ScoringProfile};
