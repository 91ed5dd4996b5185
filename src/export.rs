// src/export.rs
//! Export boundary: the fixed, ordered field set handed to consumers, as
//! CSV or JSON Lines.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fx::Confidence;
use crate::ingest::types::Opportunity;

/// Column order every export honors.
pub const EXPORT_COLUMNS: [&str; 12] = [
    "source",
    "title",
    "issuer",
    "country",
    "deadline",
    "budget_value",
    "budget_currency",
    "budget_ils",
    "budget_confidence",
    "fit_score",
    "url",
    "summary",
];

/// One exported row. Field order matches [`EXPORT_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub source: String,
    pub title: String,
    pub issuer: String,
    pub country: Option<String>,
    /// ISO `YYYY-MM-DD`.
    pub deadline: Option<String>,
    pub budget_value: Option<f64>,
    pub budget_currency: Option<String>,
    pub budget_ils: Option<f64>,
    pub budget_confidence: Confidence,
    pub fit_score: u8,
    pub url: Option<String>,
    pub summary: String,
}

impl From<&Opportunity> for ExportRow {
    fn from(op: &Opportunity) -> Self {
        Self {
            source: op.source.clone(),
            title: op.title.clone(),
            issuer: op.issuer.clone(),
            country: op.country.clone(),
            deadline: op.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            budget_value: op.budget_value,
            budget_currency: op.budget_currency.clone(),
            budget_ils: op.budget_ils,
            budget_confidence: op.budget_confidence,
            fit_score: op.fit_score,
            url: op.url.clone(),
            summary: op.summary.clone(),
        }
    }
}

/// On-disk layout of an export file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Header row plus one row per opportunity.
    #[default]
    Csv,
    /// One JSON object per line.
    JsonLines,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::JsonLines => "jsonl",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "jsonl" | "json" | "jsonlines" => Ok(ExportFormat::JsonLines),
            other => Err(anyhow!("unknown export format {other:?}")),
        }
    }
}

/// `opportunities_YYYYMMDD-HHMMSS.<ext>`
pub fn export_file_name(now: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "opportunities_{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Header row, then one row per opportunity in ranked order. The header is
/// written even when there is nothing to export. Returns rows written.
pub fn write_csv<W: Write>(w: W, ops: &[Opportunity]) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(EXPORT_COLUMNS)
        .context("writing export header")?;
    for op in ops {
        wtr.serialize(ExportRow::from(op))
            .context("serializing export row")?;
    }
    wtr.flush().context("flushing export")?;
    Ok(ops.len())
}

/// Write one JSON object per line, in ranked order. Returns rows written.
pub fn write_json_lines<W: Write>(mut w: W, ops: &[Opportunity]) -> Result<usize> {
    for op in ops {
        serde_json::to_writer(&mut w, &ExportRow::from(op)).context("serializing export row")?;
        w.write_all(b"\n").context("writing export row")?;
    }
    w.flush().context("flushing export")?;
    Ok(ops.len())
}

pub fn write_file(path: &Path, ops: &[Opportunity], format: ExportFormat) -> Result<usize> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    match format {
        ExportFormat::Csv => write_csv(BufWriter::new(f), ops),
        ExportFormat::JsonLines => write_json_lines(BufWriter::new(f), ops),
    }
}
