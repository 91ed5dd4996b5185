// src/money.rs
//! Free-text money extraction.
//!
//! Recognizes a single amount per text blob in either order:
//! `USD 15,000`, `$15000`, `₪ 1,200.50` (marker first) or `15000 EUR`
//! (number first). Symbols map to ISO codes and `NIS` folds into `ILS`.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Extracted amount. Both fields `None` means no monetary pattern was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoneyAmount {
    pub value: Option<f64>,
    pub currency: Option<String>,
}

impl MoneyAmount {
    pub fn new(value: f64, currency: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            currency: Some(currency.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        self.value.is_some() && self.currency.is_some()
    }
}

// Codes are matched anywhere, so "15000 euros" still reads as EUR.
fn marker_first() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(USD|EUR|ILS|NIS|ZAR|AOA|GBP|€|\$|₪)\s*([0-9]+(?:\.[0-9]+)?)")
            .expect("marker-first money regex")
    })
}

fn number_first() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*(USD|EUR|ILS|NIS|ZAR|AOA|GBP)")
            .expect("number-first money regex")
    })
}

/// Map a matched marker (code or symbol) to its canonical ISO code.
pub fn canonical_currency(marker: &str) -> String {
    match marker {
        "€" => "EUR".to_string(),
        "$" => "USD".to_string(),
        "₪" => "ILS".to_string(),
        other => {
            let up = other.to_ascii_uppercase();
            if up == "NIS" {
                "ILS".to_string()
            } else {
                up
            }
        }
    }
}

/// Drop thousands separators and non-breaking spaces before matching.
fn strip_separators(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ',' | '\u{00A0}' | '\u{202F}'))
        .collect()
}

/// Extract the first amount found in `text`.
///
/// The marker-first pattern is tried before the number-first one; within a
/// pattern the leftmost match wins.
pub fn extract_money(text: &str) -> MoneyAmount {
    if text.trim().is_empty() {
        return MoneyAmount::none();
    }
    let txt = strip_separators(text);

    if let Some(caps) = marker_first().captures(&txt) {
        if let Ok(value) = caps[2].parse::<f64>() {
            return MoneyAmount::new(value, canonical_currency(&caps[1]));
        }
    }

    if let Some(caps) = number_first().captures(&txt) {
        if let Ok(value) = caps[1].parse::<f64>() {
            return MoneyAmount::new(value, canonical_currency(&caps[2]));
        }
    }

    MoneyAmount::none()
}
