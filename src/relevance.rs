// src/relevance.rs
//! Fit scoring: profile config types, phrase matching, and the weighted
//! 0–100 score.
//!
//! Every component is capped on its own, the components are summed and the
//! total is clamped to `[0, 100]`. The same keyword list doubles as the hard
//! relevance gate used by the pipeline.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::fx::Confidence;

// --- env defaults & names ---
pub const DEFAULT_PROFILE_PATH: &str = "config/profile.toml";
pub const ENV_PROFILE_PATH: &str = "RADAR_PROFILE_PATH";

// Short, stable id for log lines so notice text never reaches the logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/* ----------------------------
Profile schema (from TOML)
---------------------------- */

/// Per-component weights and caps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub keyword_per_hit: u32,
    pub keyword_cap: u32,
    pub sector_per_hit: u32,
    pub sector_cap: u32,
    pub geo_priority: u32,
    pub geo_other: u32,
    pub institution: u32,
    pub company: u32,
    pub budget: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword_per_hit: 10,
            keyword_cap: 40,
            sector_per_hit: 5,
            sector_cap: 20,
            geo_priority: 30,
            geo_other: 10,
            institution: 10,
            company: 5,
            budget: 10,
        }
    }
}

/// The interest profile a notice is scored against.
///
/// Any list left out of a TOML file keeps its built-in value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringProfile {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_sector_hints")]
    pub sector_hints: Vec<String>,
    #[serde(default = "default_priority_areas")]
    pub priority_areas: Vec<String>,
    #[serde(default = "default_institution_markers")]
    pub institution_markers: Vec<String>,
    #[serde(default = "default_company_suffixes")]
    pub company_suffixes: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Monitoring & evaluation vocabulary in English, Portuguese and French.
fn default_keywords() -> Vec<String> {
    owned(&[
        "monitoring and evaluation",
        "m&e",
        "impact evaluation",
        "baseline",
        "endline",
        "results framework",
        "logframe",
        "theory of change",
        "learning agenda",
        "impact measurement",
        "sroi",
        "social value",
        "monitorização e avaliação",
        "monitorizacao e avaliacao",
        "avaliação de impacto",
        "linha de base",
        "quadro lógico",
        "teoria da mudança",
        "medição de impacto",
        "suivi et évaluation",
        "suivi & évaluation",
        "evaluation d'impact",
        "évaluation d'impact",
        "étude de base",
        "ligne de base",
        "cadre logique",
        "théorie du changement",
        "mesure d'impact",
    ])
}

fn default_sector_hints() -> Vec<String> {
    owned(&[
        "higher education",
        "university",
        "community innovation",
        "regional development",
        "local development",
        "sustainability",
        "social program",
        "youth",
        "education",
        "health",
        "agriculture",
        "employment",
        "skills",
    ])
}

fn default_priority_areas() -> Vec<String> {
    owned(&[
        "israel",
        "angola",
        "côte d’ivoire",
        "cote d’ivoire",
        "ivory coast",
        "europe",
        "european union",
        "eu",
    ])
}

fn default_institution_markers() -> Vec<String> {
    owned(&[
        "world bank",
        "african development bank",
        "united nations",
        "ministry",
        "european union",
        "commission",
        "ted notice",
    ])
}

fn default_company_suffixes() -> Vec<String> {
    owned(&[
        "ltd",
        "limited",
        "inc",
        "gmbh",
        "sarl",
        "s.a.",
        "bv",
        "plc",
        "llc",
        "company",
        "foundation",
    ])
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            keywords: default_keywords(),
            sector_hints: default_sector_hints(),
            priority_areas: default_priority_areas(),
            institution_markers: default_institution_markers(),
            company_suffixes: default_company_suffixes(),
        }
    }
}

impl ScoringProfile {
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let p: ScoringProfile = toml::from_str(toml_str)?;
        Ok(p)
    }

    /// Load from `$RADAR_PROFILE_PATH`, else `config/profile.toml`, else the
    /// built-in profile. An explicit env path that does not exist is an error.
    pub fn from_toml() -> anyhow::Result<Self> {
        let (path, explicit) = match std::env::var(ENV_PROFILE_PATH) {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (PathBuf::from(DEFAULT_PROFILE_PATH), false),
        };
        if !path.exists() {
            if explicit {
                anyhow::bail!("{ENV_PROFILE_PATH} points to non-existent path {}", path.display());
            }
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read scoring profile at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&content)
    }
}

/* ----------------------------
Scoring
---------------------------- */

/// Borrowed view of the fields the scorer reads.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub full_text: Option<&'a str>,
    pub country: Option<&'a str>,
    pub issuer: &'a str,
    pub budget_ils: Option<f64>,
    pub budget_confidence: Confidence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub keywords: u32,
    pub sectors: u32,
    pub geography: u32,
    pub issuer: u32,
    pub budget: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        let sum = self
            .keywords
            .saturating_add(self.sectors)
            .saturating_add(self.geography)
            .saturating_add(self.issuer)
            .saturating_add(self.budget);
        sum.min(100) as u8
    }
}

/// Result of scoring one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relevance {
    pub score: u8,
    pub breakdown: ScoreBreakdown,
    pub matched: Vec<String>,
    pub reasons: Vec<String>,
}

/// Compiled, lowercased profile.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    weights: ScoreWeights,
    keywords: Vec<String>,
    sector_hints: Vec<String>,
    priority_areas: Vec<String>,
    institution_markers: Vec<String>,
    company_suffixes: Vec<String>,
}

fn lowered(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn hit_points(hits: usize, per_hit: u32, cap: u32) -> u32 {
    u32::try_from(hits)
        .unwrap_or(u32::MAX)
        .saturating_mul(per_hit)
        .min(cap)
}

impl RelevanceScorer {
    pub fn new(profile: &ScoringProfile) -> Self {
        Self {
            weights: profile.weights,
            keywords: lowered(&profile.keywords),
            sector_hints: lowered(&profile.sector_hints),
            priority_areas: lowered(&profile.priority_areas),
            institution_markers: lowered(&profile.institution_markers),
            company_suffixes: lowered(&profile.company_suffixes),
        }
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        Ok(Self::new(&ScoringProfile::from_toml_str(toml_str)?))
    }

    /// Hard gate: does `text` contain at least one configured keyword?
    pub fn has_keyword(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let hay = text.to_lowercase();
        self.keywords.iter().any(|k| hay.contains(k.as_str()))
    }

    fn hits<'k>(list: &'k [String], hay: &str) -> Vec<&'k str> {
        list.iter()
            .filter(|k| hay.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Issuer text looks like a registered company ("Example Consulting SARL").
    pub fn looks_like_company(&self, issuer: &str) -> bool {
        if issuer.trim().is_empty() {
            return false;
        }
        // Suffixes must follow a space, so "Inc" inside "Province" does not count.
        let name = format!(" {}", issuer.to_lowercase());
        self.company_suffixes
            .iter()
            .any(|s| name.contains(&format!(" {s}")))
    }

    pub fn score(&self, item: &ScoreInput<'_>) -> Relevance {
        let w = &self.weights;
        let mut rel = Relevance::default();
        let mut b = ScoreBreakdown::default();

        let text_blob = [
            item.title.trim(),
            item.summary.trim(),
            item.full_text.unwrap_or_default().trim(),
        ]
        .join(" ")
        .to_lowercase();

        // 1) Keyword density
        let kw = Self::hits(&self.keywords, &text_blob);
        b.keywords = hit_points(kw.len(), w.keyword_per_hit, w.keyword_cap);
        if !kw.is_empty() {
            rel.reasons.push(format!("keywords:{}", kw.len()));
        }
        rel.matched.extend(kw.iter().map(|k| format!("kw:{k}")));

        // 2) Sector alignment
        let sectors = Self::hits(&self.sector_hints, &text_blob);
        b.sectors = hit_points(sectors.len(), w.sector_per_hit, w.sector_cap);
        if !sectors.is_empty() {
            rel.reasons.push(format!("sectors:{}", sectors.len()));
        }
        rel.matched.extend(sectors.iter().map(|s| format!("sector:{s}")));

        // 3) Geography
        let country = item.country.unwrap_or_default().trim().to_lowercase();
        let issuer = item.issuer.trim().to_lowercase();
        let region_blob = format!("{text_blob} {issuer}");
        let priority = (!country.is_empty() && self.priority_areas.contains(&country))
            || self
                .priority_areas
                .iter()
                .any(|a| region_blob.contains(a.as_str()));
        if priority {
            b.geography = w.geo_priority;
            rel.reasons.push("geo:priority".into());
        } else if !country.is_empty() {
            b.geography = w.geo_other;
            rel.reasons.push("geo:other".into());
        }

        // 4) Issuer reputation
        if self
            .institution_markers
            .iter()
            .any(|m| issuer.contains(m.as_str()))
        {
            b.issuer = b.issuer.saturating_add(w.institution);
            rel.reasons.push("issuer:institution".into());
        }
        if self.looks_like_company(&issuer) {
            b.issuer = b.issuer.saturating_add(w.company);
            rel.reasons.push("issuer:company".into());
        }

        // 5) Budget confidence
        if item.budget_ils.is_some_and(|v| v != 0.0) && item.budget_confidence.is_trusted() {
            b.budget = w.budget;
            rel.reasons.push(format!("budget:{}", item.budget_confidence));
        }

        rel.breakdown = b;
        rel.score = b.total();

        debug!(
            target: "relevance",
            id = %anon_hash(item.title),
            score = rel.score,
            matched = ?truncate_vec(&rel.matched, 5),
            reasons = ?truncate_vec(&rel.reasons, 5),
            "scored"
        );
        rel
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(&ScoringProfile::default())
    }
}

/* ----------------------------
Tests
---------------------------- */
