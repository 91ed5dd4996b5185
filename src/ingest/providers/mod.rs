// src/ingest/providers/mod.rs
//! HTML connectors for the public procurement portals.

pub mod afdb;
pub mod fetch;
pub mod israel_gov;
pub mod ungm;
pub mod world_bank;

use std::sync::Arc;

use crate::ingest::types::SourceConnector;
use crate::relevance::RelevanceScorer;
use fetch::PageFetcher;

/// Summaries are card/page text cut to this many characters.
pub const SUMMARY_MAX_CHARS: usize = 800;

/// Every production connector, sharing one fetcher.
pub fn default_connectors(
    fetcher: Arc<dyn PageFetcher>,
    gate: &RelevanceScorer,
) -> Vec<Arc<dyn SourceConnector>> {
    vec![
        Arc::new(ungm::UngmConnector::new(Arc::clone(&fetcher))),
        Arc::new(world_bank::WorldBankConnector::new(Arc::clone(&fetcher))),
        Arc::new(afdb::AfdbConnector::new(Arc::clone(&fetcher), gate.clone())),
        Arc::new(israel_gov::IsraelGovConnector::new(fetcher, gate.clone())),
    ]
}
