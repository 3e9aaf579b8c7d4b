use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies the monetary parser recognizes. NGN is the primary currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ngn,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unknown currency: {other}")),
        }
    }
}

/// A money amount lifted out of free text, with the text it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetaryValue {
    pub amount: Decimal,
    pub currency: Currency,
    pub source_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCount {
    pub value: u32,
    pub source: String,
}

/// Markets the location detector knows about, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownLocation {
    Lagos,
    Abuja,
    Enugu,
    Ghana,
    Accra,
    Ibadan,
    Casablanca,
    Marrakesh,
}

impl KnownLocation {
    pub const ALL: [KnownLocation; 8] = [
        KnownLocation::Lagos,
        KnownLocation::Abuja,
        KnownLocation::Enugu,
        KnownLocation::Ghana,
        KnownLocation::Accra,
        KnownLocation::Ibadan,
        KnownLocation::Casablanca,
        KnownLocation::Marrakesh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnownLocation::Lagos => "Lagos",
            KnownLocation::Abuja => "Abuja",
            KnownLocation::Enugu => "Enugu",
            KnownLocation::Ghana => "Ghana",
            KnownLocation::Accra => "Accra",
            KnownLocation::Ibadan => "Ibadan",
            KnownLocation::Casablanca => "Casablanca",
            KnownLocation::Marrakesh => "Marrakesh",
        }
    }
}

impl fmt::Display for KnownLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownLocation::ALL
            .iter()
            .copied()
            .find(|loc| loc.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown location: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    Multipurpose,
    Hotel,
    Apartment,
    Other,
}

impl BuildingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingType::Multipurpose => "multipurpose",
            BuildingType::Hotel => "hotel",
            BuildingType::Apartment => "apartment",
            BuildingType::Other => "other",
        }
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multipurpose" => Ok(BuildingType::Multipurpose),
            "hotel" => Ok(BuildingType::Hotel),
            "apartment" => Ok(BuildingType::Apartment),
            "other" => Ok(BuildingType::Other),
            other => Err(format!("unknown building type: {other}")),
        }
    }
}

/// Coarse investment priority derived from the payback period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeasibilityTag {
    StrongCandidate,
    NeedsReview,
    LowPriority,
}

impl FeasibilityTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeasibilityTag::StrongCandidate => "strong_candidate",
            FeasibilityTag::NeedsReview => "needs_review",
            FeasibilityTag::LowPriority => "low_priority",
        }
    }
}

impl fmt::Display for FeasibilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeasibilityTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong_candidate" => Ok(FeasibilityTag::StrongCandidate),
            "needs_review" => Ok(FeasibilityTag::NeedsReview),
            "low_priority" => Ok(FeasibilityTag::LowPriority),
            other => Err(format!("unknown feasibility tag: {other}")),
        }
    }
}

/// One discovered listing card as the crawler saw it: text fragments only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub source_id: String,
    pub source_label: String,
    pub url: String,
    pub html_snippet: String,
    pub title: Option<String>,
    pub price_text: Option<String>,
    pub rent_text: Option<String>,
    pub unit_text: Option<String>,
    pub location_text: Option<String>,
    pub type_text: Option<String>,
}

/// The normalized, audit-friendly form of a [`RawListing`].
///
/// `hash` is the upsert key: it only depends on source id, url and title, so
/// re-scraping the same card in a later run overwrites the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedListing {
    pub hash: String,
    pub source_id: String,
    pub source_label: String,
    pub url: String,
    pub title: Option<String>,
    pub price_value: Option<Decimal>,
    pub price_currency: Option<Currency>,
    pub rent_per_unit: Option<Decimal>,
    pub rent_currency: Option<Currency>,
    pub unit_count: Option<u32>,
    pub building_type: BuildingType,
    pub location: Option<KnownLocation>,
    pub annual_revenue: Option<Decimal>,
    pub roi_ratio: Option<f64>,
    pub payback_years: Option<f64>,
    pub feasibility: FeasibilityTag,
    pub price_source_text: Option<String>,
    pub rent_source_text: Option<String>,
    pub unit_source_text: Option<String>,
    pub flags: Vec<String>,
    pub raw_snippet: String,
}

impl NormalizedListing {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// A normalized listing as the store keeps it: the listing plus run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredListing {
    #[serde(flatten)]
    pub listing: NormalizedListing,
    pub run_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Output of one aggregator run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub triggered_by: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub listings: Vec<NormalizedListing>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Run-level bookkeeping handed to the store at the start and end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub triggered_by: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_sources: usize,
    pub processed_listings: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
}
