//! Free text to typed primitives.
//!
//! Every function here is total: malformed input yields `None` (or
//! [`BuildingType::Other`]) and never an error. The patterns are matched
//! exactly as stored listings were produced, quirks included, so re-scraped
//! rows stay comparable with historical ones.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::types::{BuildingType, Currency, KnownLocation, MonetaryValue, UnitCount};

/// Optional symbol, numeric token, optional magnitude suffix directly after it.
/// Alternation is leftmost-first, so "2.5 million" captures the suffix "m".
static MONEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(₦|\$)\s*)?([0-9,.]+)(\s*(?:k|m|million|thousand))?")
        .expect("money pattern compiles")
});

static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]{1,4})\s*(units|rooms|tenants|apartments)?")
        .expect("unit pattern compiles")
});

static LABELLED_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]{1,4})\s*(units|rooms|tenants|apartments)")
        .expect("labelled unit pattern compiles")
});

static HUNDRED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)hundred").expect("hundred pattern compiles"));

static USD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)usd|\$").expect("usd pattern compiles"));

static LOCATION_ALIASES: Lazy<Vec<(KnownLocation, Regex)>> = Lazy::new(|| {
    [
        (KnownLocation::Lagos, r"(?i)lagos"),
        (KnownLocation::Abuja, r"(?i)abuja"),
        (KnownLocation::Enugu, r"(?i)enugu"),
        (KnownLocation::Ghana, r"(?i)ghana"),
        (KnownLocation::Accra, r"(?i)accra"),
        (KnownLocation::Ibadan, r"(?i)ibadan"),
        (KnownLocation::Casablanca, r"(?i)casablanca"),
        (KnownLocation::Marrakesh, r"(?i)marrakech|marrakesh"),
    ]
    .into_iter()
    .map(|(loc, pattern)| (loc, Regex::new(pattern).expect("location alias compiles")))
    .collect()
});

const THOUSAND: i64 = 1_000;
const MILLION: i64 = 1_000_000;

/// Collapse runs of whitespace to one space and trim both ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip thousands separators and whitespace, then parse as a decimal.
fn sanitize_number(numeric: &str) -> Option<Decimal> {
    let stripped: String = numeric
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if !stripped.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    // "1,000." and ".5" are valid amounts; "1000.50." is not
    let trimmed = match stripped.strip_suffix('.') {
        Some(head) if !head.contains('.') => head,
        _ => stripped.as_str(),
    };
    let candidate = if trimmed.starts_with('.') {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&candidate).ok()
}

fn magnitude_multiplier(suffix: &str) -> i64 {
    let suffix = suffix.trim().to_ascii_lowercase();
    if suffix.starts_with('m') {
        MILLION
    } else if suffix.starts_with('k') || suffix.starts_with("thousand") {
        THOUSAND
    } else {
        1
    }
}

/// Round to cents, half away from zero.
fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a price or rent fragment such as `"₦2.5m"` or `"$137,000"`.
///
/// The currency is USD when the matched symbol is `$` or when "usd" or "$"
/// appears anywhere in the text; NGN otherwise.
pub fn parse_monetary_value(text: &str) -> Option<MonetaryValue> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }

    let caps = MONEY_RE.captures(&cleaned)?;
    let symbol = caps.get(1).map(|m| m.as_str());
    let numeric = caps.get(2)?.as_str();
    let multiplier = caps
        .get(3)
        .map(|m| magnitude_multiplier(m.as_str()))
        .unwrap_or(1);

    let currency = if symbol == Some("$") || USD_RE.is_match(&cleaned) {
        Currency::Usd
    } else {
        Currency::Ngn
    };

    let base = sanitize_number(numeric)?;
    let amount = to_cents(base).checked_mul(Decimal::from(multiplier))?;

    Some(MonetaryValue {
        amount: to_cents(amount),
        currency,
        source_text: cleaned,
    })
}

/// Parse a unit count such as `"100 units"`; "hundred" alone counts as 100.
///
/// A digit match always wins over the "hundred" fallback. Zero is not a unit
/// count and yields `None`.
pub fn parse_unit_count(text: &str) -> Option<UnitCount> {
    let cleaned = clean_text(text);

    if let Some(caps) = UNIT_RE.captures(&cleaned) {
        let value: u32 = caps.get(1)?.as_str().parse().ok()?;
        if value == 0 {
            return None;
        }
        return Some(UnitCount {
            value,
            source: cleaned,
        });
    }

    if HUNDRED_RE.is_match(&cleaned) {
        return Some(UnitCount {
            value: 100,
            source: cleaned,
        });
    }

    None
}

/// Unit count from a whole card's text, where bare numbers are mostly prices.
///
/// Only digits followed by a unit word count; "hundred" still means 100.
pub fn parse_labelled_unit_count(text: &str) -> Option<UnitCount> {
    let cleaned = clean_text(text);

    if let Some(caps) = LABELLED_UNIT_RE.captures(&cleaned) {
        let value: u32 = caps.get(1)?.as_str().parse().ok()?;
        if value == 0 {
            return None;
        }
        return Some(UnitCount {
            value,
            source: cleaned,
        });
    }

    if HUNDRED_RE.is_match(&cleaned) {
        return Some(UnitCount {
            value: 100,
            source: cleaned,
        });
    }

    None
}

/// First known market whose alias appears in the text.
pub fn detect_location(text: &str) -> Option<KnownLocation> {
    LOCATION_ALIASES
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(loc, _)| *loc)
}

pub fn normalize_building_type(text: &str) -> BuildingType {
    let lower = text.to_lowercase();
    if ["multipurpose", "multi-purpose", "office"]
        .iter()
        .any(|k| lower.contains(k))
    {
        BuildingType::Multipurpose
    } else if lower.contains("hotel") {
        BuildingType::Hotel
    } else if lower.contains("apartment") || lower.contains("self-contained") {
        BuildingType::Apartment
    } else {
        BuildingType::Other
    }
}
