// src/ingest/deadline.rs
//! Best-effort deadline parsing. Anything unparsable is simply `None`.

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;

const DAY_FIRST: &[&str] = &[
    "%Y-%m-%d", "%d-%b-%Y", "%d %B %Y", "%d %b %Y", "%d.%m.%Y", "%d/%m/%Y", "%B %d, %Y",
];
const MONTH_FIRST: &[&str] = &[
    "%Y-%m-%d", "%d-%b-%Y", "%d %B %Y", "%d %b %Y", "%m/%d/%Y", "%d.%m.%Y", "%B %d, %Y",
];

/// Parse a date at the start of `text`; trailing text such as a time or a
/// timezone label is ignored ("15-Dec-2025 17:00 (GMT 1.00)").
pub fn parse_deadline(text: &str, day_first: bool) -> Option<NaiveDate> {
    let t = text.trim().trim_start_matches(|c: char| !c.is_alphanumeric());
    if t.is_empty() {
        return None;
    }
    let formats = if day_first { DAY_FIRST } else { MONTH_FIRST };
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_and_remainder(t, f).ok().map(|(d, _)| d))
}

fn long_date_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2} [A-Za-z]+ \d{4})\b").expect("long date regex"))
}

fn dotted_date_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2}\.\d{2}\.\d{4})\b").expect("dotted date regex"))
}

fn labelled_date_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:deadline|closing date):?\s*(\d{1,2}\s+[A-Za-z]+\s+\d{4})")
            .expect("labelled date regex")
    })
}

/// First `12 March 2025`-style date anywhere in `text`.
pub fn find_long_date(text: &str) -> Option<NaiveDate> {
    long_date_re()
        .captures_iter(text)
        .find_map(|c| parse_deadline(&c[1], true))
}

/// First `dd.mm.yyyy` date anywhere in `text`.
pub fn find_dotted_date(text: &str) -> Option<NaiveDate> {
    dotted_date_re()
        .captures_iter(text)
        .find_map(|c| parse_deadline(&c[1], true))
}

/// Date following a "Deadline:" or "Closing date:" label.
pub fn find_labelled_date(text: &str) -> Option<NaiveDate> {
    labelled_date_re()
        .captures_iter(text)
        .find_map(|c| parse_deadline(&c[1], true))
}
