//! Deterministic natural-language extraction
//!
//! Pure functions over text: amounts, spoken numbers, relative dates,
//! merchants. Decoupled from the reasoning call so heuristic accuracy is
//! testable without any external dependency.

use crate::models::ExtractedExpense;
use chrono::{Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Currency symbol/word adjacent to a number with optional thousands
    /// separators and up to two decimal places.
    static ref AMOUNT_RE: Regex = Regex::new(
        r"(?i)(?:₹|\$|\b(?:rs\.?|inr|usd|eur))\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)|([0-9][0-9,]*(?:\.[0-9]{1,2})?)\s*(?:rupees?\b|rs\b\.?|inr\b|dollars?\b|bucks\b)"
    )
    .unwrap();
    static ref DAYS_AGO_RE: Regex = Regex::new(r"(?i)\b(\d{1,3})\s+days?\s+ago\b").unwrap();
    static ref MERCHANT_AT_RE: Regex = Regex::new(
        r"\b(?i:at|from)\s+([A-Z][A-Za-z0-9&'.-]*(?:\s+[A-Z][A-Za-z0-9&'.-]*)*)"
    )
    .unwrap();
    static ref MERCHANT_ON_RE: Regex = Regex::new(
        r"\b(?i:on|for|via|to)\s+([A-Z][A-Za-z0-9&'.-]*(?:\s+[A-Z][A-Za-z0-9&'.-]*)*)"
    )
    .unwrap();
}

/// Word-number vocabulary for spoken amounts.
const UNITS: &[(&str, u64)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS: &[(&str, u64)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

const SCALES: &[(&str, u64)] = &[("hundred", 100), ("thousand", 1_000), ("lakh", 100_000)];

fn lookup(table: &[(&str, u64)], word: &str) -> Option<u64> {
    table.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}

/// Strip thousands separators and parse a numeral string.
pub fn parse_numeral(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

/// First currency-marked numeral in the text. No match yields `None`,
/// which is not an error.
pub fn extract_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    parse_numeral(raw)
}

/// Parse a spoken amount like "fifty", "two hundred", "two hundred fifty".
/// Attempted only when the numeral pattern finds nothing.
pub fn parse_spoken_amount(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut found = false;

    for word in lowered.split(|c: char| !c.is_alphabetic()) {
        if word.is_empty() {
            continue;
        }
        if let Some(value) = lookup(UNITS, word).or_else(|| lookup(TENS, word)) {
            current += value;
            found = true;
        } else if let Some(scale) = lookup(SCALES, word) {
            if current == 0 {
                current = 1;
            }
            current *= scale;
            if scale >= 1_000 {
                total += current;
                current = 0;
            }
            found = true;
        } else if found {
            // Stop at the first non-number word after a number run.
            break;
        }
    }

    if found {
        Some((total + current) as f64)
    } else {
        None
    }
}

/// Resolve a relative date reference against `today`.
/// Unrecognized references yield `None` rather than a guess.
pub fn resolve_date_reference(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();

    if lowered.contains("yesterday") || lowered.contains("last night") {
        return Some(today - Duration::days(1));
    }
    if let Some(caps) = DAYS_AGO_RE.captures(&lowered) {
        let days: i64 = caps[1].parse().ok()?;
        return Some(today - Duration::days(days));
    }
    if lowered.contains("last week") {
        return Some(today - Duration::days(7));
    }
    if lowered.contains("today") {
        return Some(today);
    }

    None
}

/// Capitalized token(s) after a merchant preposition. "at"/"from" are the
/// strongest markers and win over "on"/"for"/"via"/"to".
pub fn extract_merchant(text: &str) -> Option<String> {
    for re in [&*MERCHANT_AT_RE, &*MERCHANT_ON_RE] {
        if let Some(caps) = re.captures(text) {
            let name = caps[1].trim().trim_end_matches('.').to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    None
}

/// Currency inferred from an explicit marker in the text.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    if lowered.contains('₹')
        || lowered.contains("rs.")
        || lowered.contains("rupee")
        || lowered.contains("inr")
    {
        Some("INR")
    } else if lowered.contains('$') || lowered.contains("dollar") || lowered.contains("usd") {
        Some("USD")
    } else if lowered.contains('€') || lowered.contains("eur") {
        Some("EUR")
    } else {
        None
    }
}

/// Combined heuristic extraction over a transcript or message. Used for
/// prompt hints and as the backstop behind the reasoning call.
pub fn extract_expense(text: &str, today: NaiveDate, default_currency: &str) -> ExtractedExpense {
    let amount = extract_amount(text).or_else(|| parse_spoken_amount(text));
    let merchant = extract_merchant(text);
    let date = resolve_date_reference(text, today);

    let mut confidence: f32 = 0.6;
    if amount.is_some() {
        confidence += 0.15;
    }
    if merchant.is_some() {
        confidence += 0.1;
    }
    if date.is_some() {
        confidence += 0.05;
    }

    let trimmed = text.trim();
    ExtractedExpense {
        amount,
        currency: detect_currency(text).unwrap_or(default_currency).to_string(),
        description: if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        },
        merchant,
        category: None,
        date,
        confidence: confidence.min(0.95),
    }
}
