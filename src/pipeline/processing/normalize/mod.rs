use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::NormalizeConfig;
use crate::constants::{
    FLAG_MISSING_PRICE, FLAG_MISSING_RENT, FLAG_MISSING_UNITS, FLAG_RENT_ESTIMATED,
    FLAG_UNITS_ASSUMED, RENT_BASELINE_SOURCE_TEXT,
};
use crate::idempotency::build_listing_hash;
use crate::pipeline::processing::extract::{
    detect_location, normalize_building_type, parse_labelled_unit_count, parse_monetary_value,
    parse_unit_count,
};
use crate::pipeline::processing::feasibility::evaluate_feasibility;
use crate::types::{Currency, MonetaryValue, NormalizedListing, RawListing};

/// Cards that only say "₦1m" somewhere are assumed to quote the tenant baseline.
static RENT_BASELINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)₦?1\s?m").expect("baseline pattern compiles"));

/// Trait for turning one raw listing into its normalized form
pub trait Normalizer: Send + Sync {
    /// Never fails: unparseable fields come back absent and flagged.
    fn normalize(&self, raw: &RawListing) -> NormalizedListing;
}

/// Derived money figures for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Financials {
    pub annual_revenue: Option<Decimal>,
    pub roi_ratio: Option<f64>,
    pub payback_years: Option<f64>,
}

/// `revenue = rent * units`, `roi = revenue / price`, `payback = price / revenue`.
///
/// Each figure is `None` unless both operands exist and are non-zero.
pub fn compute_financials(
    price: Option<Decimal>,
    rent_per_unit: Option<Decimal>,
    unit_count: Option<u32>,
) -> Financials {
    let annual_revenue = match (rent_per_unit, unit_count) {
        (Some(rent), Some(units)) => rent.checked_mul(Decimal::from(units)),
        _ => None,
    };

    let roi_ratio = match (annual_revenue, price) {
        (Some(revenue), Some(price)) if !price.is_zero() => {
            revenue.checked_div(price).and_then(|r| r.to_f64())
        }
        _ => None,
    };

    let payback_years = match (price, annual_revenue) {
        (Some(price), Some(revenue)) if !revenue.is_zero() && !price.is_zero() => {
            price.checked_div(revenue).and_then(|p| p.to_f64())
        }
        _ => None,
    };

    Financials {
        annual_revenue,
        roi_ratio,
        payback_years,
    }
}

/// Append a flag once, keeping first-seen order.
pub fn push_flag(flags: &mut Vec<String>, flag: &str) {
    if !flags.iter().any(|f| f == flag) {
        flags.push(flag.to_string());
    }
}

/// Add a `missing_*` flag for each of price, rent and units still absent.
pub fn flag_missing_fields(
    flags: &mut Vec<String>,
    has_price: bool,
    has_rent: bool,
    has_units: bool,
) {
    if !has_price {
        push_flag(flags, FLAG_MISSING_PRICE);
    }
    if !has_rent {
        push_flag(flags, FLAG_MISSING_RENT);
    }
    if !has_units {
        push_flag(flags, FLAG_MISSING_UNITS);
    }
}

/// The listing normalizer, parameterized by the baseline constants.
#[derive(Debug, Clone)]
pub struct ListingNormalizer {
    rent_baseline: Decimal,
    default_unit_count: u32,
}

impl Default for ListingNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizeConfig::default())
    }
}

impl ListingNormalizer {
    pub fn new(rent_baseline: Decimal, default_unit_count: u32) -> Self {
        Self {
            rent_baseline,
            default_unit_count,
        }
    }

    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self::new(Decimal::from(config.rent_baseline), config.default_unit_count)
    }

    fn baseline_rent(&self) -> MonetaryValue {
        MonetaryValue {
            amount: self.rent_baseline,
            currency: Currency::Ngn,
            source_text: RENT_BASELINE_SOURCE_TEXT.to_string(),
        }
    }
}

impl Normalizer for ListingNormalizer {
    fn normalize(&self, raw: &RawListing) -> NormalizedListing {
        let mut flags = Vec::new();
        let snippet = raw.html_snippet.as_str();

        let price = raw.price_text.as_deref().and_then(parse_monetary_value);

        let mut rent = raw.rent_text.as_deref().and_then(parse_monetary_value);
        if rent.is_none() && RENT_BASELINE_RE.is_match(snippet) {
            rent = Some(self.baseline_rent());
            push_flag(&mut flags, FLAG_RENT_ESTIMATED);
        }

        let unit_info = match raw.unit_text.as_deref() {
            Some(text) => parse_unit_count(text),
            None => parse_labelled_unit_count(snippet),
        };
        let location = detect_location(raw.location_text.as_deref().unwrap_or(snippet));
        let building_type = normalize_building_type(raw.type_text.as_deref().unwrap_or(snippet));

        let unit_count = match (&unit_info, &rent) {
            (Some(info), _) => Some(info.value),
            (None, Some(_)) => {
                push_flag(&mut flags, FLAG_UNITS_ASSUMED);
                Some(self.default_unit_count)
            }
            (None, None) => None,
        };

        let financials = compute_financials(
            price.as_ref().map(|p| p.amount),
            rent.as_ref().map(|r| r.amount),
            unit_count,
        );
        let feasibility = evaluate_feasibility(financials.payback_years);
        let hash = build_listing_hash(&raw.source_id, &raw.url, raw.title.as_deref());

        flag_missing_fields(
            &mut flags,
            price.is_some(),
            rent.is_some(),
            unit_count.is_some(),
        );

        NormalizedListing {
            hash,
            source_id: raw.source_id.clone(),
            source_label: raw.source_label.clone(),
            url: raw.url.clone(),
            title: raw.title.clone(),
            price_value: price.as_ref().map(|p| p.amount),
            price_currency: price.as_ref().map(|p| p.currency),
            rent_per_unit: rent.as_ref().map(|r| r.amount),
            rent_currency: rent.as_ref().map(|r| r.currency),
            unit_count,
            building_type,
            location,
            annual_revenue: financials.annual_revenue,
            roi_ratio: financials.roi_ratio,
            payback_years: financials.payback_years,
            feasibility,
            price_source_text: price.map(|p| p.source_text),
            rent_source_text: rent.map(|r| r.source_text),
            unit_source_text: unit_info.map(|u| u.source),
            flags,
            raw_snippet: raw.html_snippet.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildingType, FeasibilityTag, KnownLocation};

    fn raw(snippet: &str) -> RawListing {
        RawListing {
            source_id: "propertypro_ng".to_string(),
            source_label: "PropertyPro (Nigeria)".to_string(),
            url: "https://www.propertypro.ng/listing/sample-hotel".to_string(),
            html_snippet: snippet.to_string(),
            title: Some("100-unit Hotel - Victoria Island".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fully_observed_listing() {
        let listing = RawListing {
            price_text: Some("₦750,000,000".to_string()),
            rent_text: Some("₦1,000,000".to_string()),
            unit_text: Some("100 units".to_string()),
            location_text: Some("Victoria Island, Lagos".to_string()),
            type_text: Some("Hotel".to_string()),
            ..raw("<div class=\"single-room-sale\">...</div>")
        };

        let n = ListingNormalizer::default().normalize(&listing);

        assert_eq!(n.price_value, Some(Decimal::from(750_000_000)));
        assert_eq!(n.price_currency, Some(Currency::Ngn));
        assert_eq!(n.rent_per_unit, Some(Decimal::from(1_000_000)));
        assert_eq!(n.rent_currency, Some(Currency::Ngn));
        assert_eq!(n.unit_count, Some(100));
        assert_eq!(n.annual_revenue, Some(Decimal::from(100_000_000)));
        assert!((n.roi_ratio.unwrap() - 0.1333).abs() < 1e-4);
        assert_eq!(n.payback_years, Some(7.5));
        assert_eq!(n.feasibility, FeasibilityTag::NeedsReview);
        assert_eq!(n.building_type, BuildingType::Hotel);
        assert_eq!(n.location, Some(KnownLocation::Lagos));
        assert!(n.flags.is_empty());
        assert_eq!(n.price_source_text.as_deref(), Some("₦750,000,000"));
        assert_eq!(n.unit_source_text.as_deref(), Some("100 units"));
        assert_eq!(
            n.hash,
            build_listing_hash(&listing.source_id, &listing.url, listing.title.as_deref())
        );
    }

    #[test]
    fn test_price_only_listing_flags_missing_rent_and_units() {
        let listing = RawListing {
            price_text: Some("₦120,000,000".to_string()),
            ..raw("<p>Detached duplex in Lekki, ₦120,000,000</p>")
        };

        let n = ListingNormalizer::default().normalize(&listing);

        assert_eq!(n.price_value, Some(Decimal::from(120_000_000)));
        assert!(n.rent_per_unit.is_none());
        assert!(n.unit_count.is_none());
        assert!(n.annual_revenue.is_none());
        assert!(n.roi_ratio.is_none());
        assert!(n.payback_years.is_none());
        assert_eq!(n.feasibility, FeasibilityTag::NeedsReview);
        assert_eq!(n.flags, vec![FLAG_MISSING_RENT, FLAG_MISSING_UNITS]);
    }

    #[test]
    fn test_baseline_rent_and_assumed_units() {
        let listing = RawListing {
            price_text: Some("₦250m".to_string()),
            ..raw("<p>Hotel in Abuja. Tenants pay ₦1m yearly</p>")
        };

        let n = ListingNormalizer::default().normalize(&listing);

        assert_eq!(n.rent_per_unit, Some(Decimal::from(1_000_000)));
        assert_eq!(n.rent_currency, Some(Currency::Ngn));
        assert_eq!(n.rent_source_text.as_deref(), Some(RENT_BASELINE_SOURCE_TEXT));
        assert_eq!(n.unit_count, Some(100));
        assert!(n.unit_source_text.is_none());
        assert_eq!(n.flags, vec![FLAG_RENT_ESTIMATED, FLAG_UNITS_ASSUMED]);
        assert_eq!(n.annual_revenue, Some(Decimal::from(100_000_000)));
        assert_eq!(n.payback_years, Some(2.5));
        assert_eq!(n.feasibility, FeasibilityTag::StrongCandidate);
        assert_eq!(n.location, Some(KnownLocation::Abuja));
        assert_eq!(n.building_type, BuildingType::Hotel);
    }

    #[test]
    fn test_estimation_and_missing_flags_co_occur() {
        let n = ListingNormalizer::default().normalize(&raw("₦1M tenants wanted"));

        assert_eq!(
            n.flags,
            vec![FLAG_RENT_ESTIMATED, FLAG_UNITS_ASSUMED, FLAG_MISSING_PRICE]
        );
        assert!(n.roi_ratio.is_none());
        assert!(n.payback_years.is_none());
    }

    #[test]
    fn test_explicit_unit_text_blocks_snippet_fallback() {
        let listing = RawListing {
            rent_text: Some("₦800k".to_string()),
            unit_text: Some(String::new()),
            ..raw("<p>40 rooms</p>")
        };

        let n = ListingNormalizer::default().normalize(&listing);

        // rent exists, unit text was present but empty: baseline units
        assert_eq!(n.unit_count, Some(100));
        assert!(n.has_flag(FLAG_UNITS_ASSUMED));
    }

    #[test]
    fn test_snippet_fallbacks() {
        let n = ListingNormalizer::default()
            .normalize(&raw("<div>Serviced apartment block, 24 units, East Legon, Accra</div>"));

        assert_eq!(n.unit_count, Some(24));
        assert_eq!(n.location, Some(KnownLocation::Accra));
        assert_eq!(n.building_type, BuildingType::Apartment);
        assert_eq!(n.flags, vec![FLAG_MISSING_PRICE, FLAG_MISSING_RENT]);
    }

    #[test]
    fn test_configured_baselines() {
        let normalizer = ListingNormalizer::new(Decimal::from(600_000), 12);
        let n = normalizer.normalize(&raw("1m"));

        assert_eq!(n.rent_per_unit, Some(Decimal::from(600_000)));
        assert_eq!(n.unit_count, Some(12));
    }

    #[test]
    fn test_zero_price_has_no_ratios() {
        let f = compute_financials(Some(Decimal::ZERO), Some(Decimal::from(5)), Some(2));
        assert_eq!(f.annual_revenue, Some(Decimal::from(10)));
        assert!(f.roi_ratio.is_none());
        assert!(f.payback_years.is_none());
    }

    #[test]
    fn test_zero_revenue_has_no_payback() {
        let f = compute_financials(Some(Decimal::from(1_000)), Some(Decimal::ZERO), Some(10));
        assert_eq!(f.annual_revenue, Some(Decimal::ZERO));
        assert_eq!(f.roi_ratio, Some(0.0));
        assert!(f.payback_years.is_none());
    }
}
