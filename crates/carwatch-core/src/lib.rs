use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "carwatch-core";

pub const UNKNOWN_YEAR: &str = "Unknown";

pub const MIN_MODEL_YEAR: i32 = 1980;

pub const INQUIRY_TOKENS: &[&str] = &[
    "call",
    "llame",
    "llamar",
    "negotiable",
    "negociable",
    "ask",
    "consult",
    "info",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedListing {
    pub title: String,
    pub link: String,
    pub mileage: String,
    pub price: String,
    pub is_hybrid: bool,
    pub year: String,
}

impl ScrapedListing {
    pub fn natural_key(&self) -> &str {
        self.link.trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: i64,
    pub link: String,
    pub title: String,
    pub year: String,
    pub mileage: String,
    pub price: String,
    pub is_hybrid: bool,
    pub date_found: NaiveDate,
    pub still_available: bool,
    pub manual_price: bool,
}

impl ListingRecord {
    pub fn days_on_market(&self, today: NaiveDate) -> i64 {
        (today - self.date_found).num_days().max(0)
    }

    pub fn numeric_price(&self) -> Option<u64> {
        parse_price(&self.price)
    }

    pub fn numeric_mileage(&self) -> Option<u64> {
        parse_mileage(&self.mileage)
    }
}

/// Digits-only parse of a scraped price.
///
/// Inquiry wording ("call", "negociable", ...) yields `None` rather than zero,
/// and a trailing cents part such as `.00` is dropped before the digits are joined.
pub fn parse_price(raw: &str) -> Option<u64> {
    let lowered = raw.to_lowercase();
    if INQUIRY_TOKENS.iter().any(|token| lowered.contains(token)) {
        return None;
    }
    digits_to_number(strip_cents(lowered.trim()))
}

pub fn parse_mileage(raw: &str) -> Option<u64> {
    digits_to_number(raw)
}

fn strip_cents(value: &str) -> &str {
    match value.rfind('.') {
        Some(pos) => {
            let tail = &value[pos + 1..];
            if !tail.is_empty() && tail.len() <= 2 && tail.chars().all(|c| c.is_ascii_digit()) {
                &value[..pos]
            } else {
                value
            }
        }
        None => value,
    }
}

fn digits_to_number(value: &str) -> Option<u64> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn extract_year(title: &str, today: NaiveDate) -> String {
    let max_year = today.year() + 1;
    title
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 4)
        .filter_map(|token| token.parse::<i32>().ok())
        .find(|year| (MIN_MODEL_YEAR..=max_year).contains(year))
        .map(|year| year.to_string())
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}
