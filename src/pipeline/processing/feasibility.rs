use crate::types::FeasibilityTag;

const STRONG_MIN_YEARS: f64 = 2.0;
const STRONG_MAX_YEARS: f64 = 5.0;
const REVIEW_MAX_YEARS: f64 = 10.0;

/// Map a payback period (years) to a priority tag.
///
/// Paybacks under two years land in `LowPriority` together with those over
/// ten. Both ends of the strong band (2..=5) are inclusive.
pub fn evaluate_feasibility(payback_years: Option<f64>) -> FeasibilityTag {
    let years = match payback_years {
        Some(y) if !y.is_nan() && y != 0.0 => y,
        _ => return FeasibilityTag::NeedsReview,
    };

    if (STRONG_MIN_YEARS..=STRONG_MAX_YEARS).contains(&years) {
        FeasibilityTag::StrongCandidate
    } else if years > STRONG_MAX_YEARS && years <= REVIEW_MAX_YEARS {
        FeasibilityTag::NeedsReview
    } else {
        FeasibilityTag::LowPriority
    }
}
