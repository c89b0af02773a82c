//! Static tables and thresholds shared by the extractors.

/// Lowest score an analysis may carry.
pub const MIN_SCORE: f64 = 0.0;

/// Highest score an analysis may carry.
pub const MAX_SCORE: f64 = 10.0;

/// Number of UN Sustainable Development Goals.
pub const SDG_COUNT: usize = 17;

/// The loose tier runs when the strict tier found fewer SDGs than this.
pub const LOOSE_TIER_THRESHOLD: usize = 10;

/// The fallback tier runs when fewer SDGs than this have been filled.
pub const FALLBACK_TIER_THRESHOLD: usize = 15;

/// Score used by the loose tier when neither capture parses as a number.
pub const AMBIGUOUS_SCORE: f64 = 5.0;

/// Scores at or above this are `High` impact.
pub const HIGH_IMPACT_THRESHOLD: f64 = 7.0;

/// Scores at or above this (and below `HIGH_IMPACT_THRESHOLD`) are `Medium` impact.
pub const MEDIUM_IMPACT_THRESHOLD: f64 = 4.0;

/// Maximum number of recommendations kept from a response.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Canonical UN SDG titles, indexed by goal number minus one.
pub const SDG_NAMES: [&str; SDG_COUNT] = [
    "No Poverty",
    "Zero Hunger",
    "Good Health and Well-being",
    "Quality Education",
    "Gender Equality",
    "Clean Water and Sanitation",
    "Affordable and Clean Energy",
    "Decent Work and Economic Growth",
    "Industry, Innovation and Infrastructure",
    "Reduced Inequalities",
    "Sustainable Cities and Communities",
    "Responsible Consumption and Production",
    "Climate Action",
    "Life Below Water",
    "Life on Land",
    "Peace, Justice and Strong Institutions",
    "Partnerships for the Goals",
];

/// Clamp a score into `[MIN_SCORE, MAX_SCORE]`. NaN becomes `MIN_SCORE`.
///
/// # Examples
/// ```
/// use compass_analysis::config::clamp_score;
///
/// assert_eq!(clamp_score(12.0), 10.0);
/// assert_eq!(clamp_score(-1.0), 0.0);
/// assert_eq!(clamp_score(f64::NAN), 0.0);
/// ```
#[must_use]
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        MIN_SCORE
    } else {
        score.clamp(MIN_SCORE, MAX_SCORE)
    }
}
