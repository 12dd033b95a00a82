//! Publication-year recency tiers

use chrono::{Datelike, Utc};

/// Score for the current or previous year
pub const RECENT_SCORE: f64 = 1.0;

/// Score for two to five years back
pub const MID_SCORE: f64 = 0.6;

/// Score for everything else, including years after the reference year
pub const OLD_SCORE: f64 = 0.2;

/// Map a publication year to a three-tier recency score.
///
/// Future years are not validated separately; they land in the lowest tier.
pub fn recency_score(year: i32, reference_year: i32) -> f64 {
    if year > reference_year {
        OLD_SCORE
    } else if year >= reference_year - 1 {
        RECENT_SCORE
    } else if year >= reference_year - 5 {
        MID_SCORE
    } else {
        OLD_SCORE
    }
}

/// Current calendar year (UTC)
pub fn current_year() -> i32 {
    Utc::now().year()
}
