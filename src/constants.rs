/// Source identifiers for the built-in scrape targets
pub const PROPERTYPRO_NG: &str = "propertypro_ng";
pub const MEQASA_GH: &str = "meqasa_gh";

pub const PROPERTYPRO_NG_LABEL: &str = "PropertyPro (Nigeria)";
pub const MEQASA_GH_LABEL: &str = "Meqasa (Ghana)";

/// Yearly rent per tenant assumed when a card only mentions "₦1m"
pub const RENT_BASELINE: i64 = 1_000_000;
pub const RENT_BASELINE_SOURCE_TEXT: &str = "Heuristic ₦1M tenant baseline";

/// Unit count assumed when a rent figure exists but no unit count was found
pub const DEFAULT_UNIT_COUNT: u32 = 100;

/// Upper bound on the raw text kept per listing
pub const SNIPPET_LIMIT: usize = 6000;

pub const USER_AGENT: &str = "AfriscanPropertyFinderBot/0.1 (+contact owner)";

// Data-quality flags, in the order the normalizer may emit them
pub const FLAG_RENT_ESTIMATED: &str = "rent_estimated_from_baseline";
pub const FLAG_UNITS_ASSUMED: &str = "unit_count_assumed_baseline";
pub const FLAG_MISSING_PRICE: &str = "missing_price";
pub const FLAG_MISSING_RENT: &str = "missing_rent";
pub const FLAG_MISSING_UNITS: &str = "missing_units";
pub const FLAG_MANUAL_OVERRIDE: &str = "manual_override";
