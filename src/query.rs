//! Read-side helpers behind the dashboard: filtering, summary cards and
//! manual overrides of stored listings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    FLAG_MANUAL_OVERRIDE, FLAG_MISSING_PRICE, FLAG_MISSING_RENT, FLAG_MISSING_UNITS,
    FLAG_RENT_ESTIMATED, FLAG_UNITS_ASSUMED,
};
use crate::pipeline::processing::feasibility::evaluate_feasibility;
use crate::pipeline::processing::normalize::{compute_financials, push_flag};
use crate::types::{Currency, FeasibilityTag, KnownLocation, StoredListing};

const OVERRIDE_SOURCE_TEXT: &str = "manual override";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub location: Option<String>,
    pub building_type: Option<String>,
    pub feasibility: Option<String>,
    pub search: Option<String>,
}

/// `None`, empty and `all` disable a filter field.
fn active(value: &Option<String>) -> Option<&str> {
    match value.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(v) => Some(v),
    }
}

impl ListingFilter {
    pub fn matches(&self, stored: &StoredListing) -> bool {
        let listing = &stored.listing;
        if let Some(location) = active(&self.location) {
            if listing.location.map(|l| l.as_str()) != Some(location) {
                return false;
            }
        }
        if let Some(building_type) = active(&self.building_type) {
            if listing.building_type.as_str() != building_type {
                return false;
            }
        }
        if let Some(feasibility) = active(&self.feasibility) {
            if listing.feasibility.as_str() != feasibility {
                return false;
            }
        }
        if let Some(search) = active(&self.search) {
            let haystack = format!(
                "{} {} {}",
                listing.title.as_deref().unwrap_or(""),
                listing.location.map(|l| l.as_str()).unwrap_or(""),
                listing.source_label
            )
            .to_lowercase();
            if !haystack.contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, listings: Vec<StoredListing>) -> Vec<StoredListing> {
        listings.into_iter().filter(|l| self.matches(l)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: usize,
    pub strong_candidates: usize,
    pub avg_roi: Option<f64>,
    pub avg_payback: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DashboardSummary {
    /// Averages count a missing ROI or payback as zero.
    pub fn from_listings(listings: &[StoredListing]) -> Self {
        let total = listings.len();
        if total == 0 {
            return Self {
                total,
                strong_candidates: 0,
                avg_roi: None,
                avg_payback: None,
                last_updated: None,
            };
        }

        let strong_candidates = listings
            .iter()
            .filter(|l| l.listing.feasibility == FeasibilityTag::StrongCandidate)
            .count();
        let roi_sum: f64 = listings.iter().map(|l| l.listing.roi_ratio.unwrap_or(0.0)).sum();
        let payback_sum: f64 = listings
            .iter()
            .map(|l| l.listing.payback_years.unwrap_or(0.0))
            .sum();

        Self {
            total,
            strong_candidates,
            avg_roi: Some(roi_sum / total as f64),
            avg_payback: Some(payback_sum / total as f64),
            last_updated: listings.iter().map(|l| l.updated_at).max(),
        }
    }
}

/// Hand-entered corrections for one listing. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingOverride {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_value: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub rent_per_unit: Option<Decimal>,
    pub unit_count: Option<u32>,
    pub location: Option<KnownLocation>,
}

impl ListingOverride {
    /// A zero unit count is not a count, so it does not make an override
    /// non-empty.
    pub fn is_empty(&self) -> bool {
        self.price_value.is_none()
            && self.rent_per_unit.is_none()
            && self.units().is_none()
            && self.location.is_none()
    }

    fn units(&self) -> Option<u32> {
        self.unit_count.filter(|u| *u > 0)
    }

    /// Write the overridden fields into `stored` and recompute everything
    /// derived from them.
    pub fn apply(&self, stored: &mut StoredListing) {
        let listing = &mut stored.listing;

        if let Some(price) = self.price_value {
            listing.price_value = Some(price);
            listing.price_currency = listing.price_currency.or(Some(Currency::Ngn));
            listing.price_source_text = Some(OVERRIDE_SOURCE_TEXT.to_string());
        }
        if let Some(rent) = self.rent_per_unit {
            listing.rent_per_unit = Some(rent);
            listing.rent_currency = listing.rent_currency.or(Some(Currency::Ngn));
            listing.rent_source_text = Some(OVERRIDE_SOURCE_TEXT.to_string());
        }
        if let Some(units) = self.units() {
            listing.unit_count = Some(units);
            listing.unit_source_text = Some(OVERRIDE_SOURCE_TEXT.to_string());
        }
        if let Some(location) = self.location {
            listing.location = Some(location);
        }

        let financials =
            compute_financials(listing.price_value, listing.rent_per_unit, listing.unit_count);
        listing.annual_revenue = financials.annual_revenue;
        listing.roi_ratio = financials.roi_ratio;
        listing.payback_years = financials.payback_years;
        listing.feasibility = evaluate_feasibility(financials.payback_years);

        let has_price = listing.price_value.is_some();
        let has_rent = listing.rent_per_unit.is_some();
        let has_units = listing.unit_count.is_some();
        let rent_entered = self.rent_per_unit.is_some();
        let units_entered = self.units().is_some();
        listing.flags.retain(|flag| match flag.as_str() {
            FLAG_MISSING_PRICE => !has_price,
            FLAG_MISSING_RENT => !has_rent,
            FLAG_MISSING_UNITS => !has_units,
            FLAG_RENT_ESTIMATED => !rent_entered,
            FLAG_UNITS_ASSUMED => !units_entered,
            _ => true,
        });
        push_flag(&mut listing.flags, FLAG_MANUAL_OVERRIDE);

        stored.updated_at = Utc::now();
    }
}
