//! Year-over-year trend computation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::types::{AnalysisResult, EsgCategory, SdgId, Trend};

/// Scores of one ESG category or SDG across the compared years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub scores: BTreeMap<i32, f64>,
    /// Score in the latest year minus score in the earliest year.
    pub change: f64,
    pub trend: Trend,
}

impl TrendEntry {
    /// Build an entry from per-year scores. Intermediate years are kept but
    /// only the endpoints decide `change`.
    fn from_scores(scores: BTreeMap<i32, f64>) -> Self {
        let first = scores.values().next().copied().unwrap_or(0.0);
        let last = scores.values().next_back().copied().unwrap_or(0.0);
        let change = last - first;
        Self {
            scores,
            change,
            trend: Trend::from_change(change),
        }
    }
}

/// Trends for every ESG category and every SDG the company engages with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    /// Compared years, ascending.
    pub years: Vec<i32>,
    pub esg_trends: BTreeMap<EsgCategory, TrendEntry>,
    /// Only SDGs with a non-zero score in at least one year.
    pub sdg_trends: BTreeMap<SdgId, TrendEntry>,
}

/// Compute trends between the earliest and latest year in `results_by_year`.
///
/// # Errors
/// Returns [`AnalysisError::InsufficientData`] when fewer than two years are given.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use compass_analysis::{compute_trends, AnalysisResult};
///
/// let mut results = BTreeMap::new();
/// results.insert(2023, AnalysisResult::default());
/// assert!(compute_trends(&results).is_err());
/// ```
pub fn compute_trends(results_by_year: &BTreeMap<i32, AnalysisResult>) -> Result<Trends> {
    if results_by_year.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            years: results_by_year.len(),
        });
    }

    let years: Vec<i32> = results_by_year.keys().copied().collect();

    let esg_trends = EsgCategory::ALL
        .into_iter()
        .map(|category| {
            let scores = results_by_year
                .iter()
                .map(|(year, result)| (*year, result.esg_analysis.get(category).score))
                .collect();
            (category, TrendEntry::from_scores(scores))
        })
        .collect();

    let sdg_trends: BTreeMap<SdgId, TrendEntry> = SdgId::all()
        .filter_map(|id| {
            let scores: BTreeMap<i32, f64> = results_by_year
                .iter()
                .map(|(year, result)| (*year, result.sdg_mapping.get(id).score))
                .collect();
            scores
                .values()
                .any(|score| *score != 0.0)
                .then(|| (id, TrendEntry::from_scores(scores)))
        })
        .collect();

    debug!(
        years = years.len(),
        active_sdgs = sdg_trends.len(),
        "trends computed"
    );

    Ok(Trends {
        years,
        esg_trends,
        sdg_trends,
    })
}
