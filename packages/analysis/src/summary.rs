//! Aggregate counters over computed trends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::trend::{compute_trends, TrendEntry, Trends};
use crate::types::{AnalysisResult, EsgCategory, SdgId, Trend};

/// ESG trend counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsgSummary {
    pub improving_categories: usize,
    pub declining_categories: usize,
}

/// SDG trend counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdgSummary {
    pub improving_sdgs: usize,
    pub declining_sdgs: usize,
    pub total_active_sdgs: usize,
}

/// Headline numbers of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total_years_compared: usize,
    /// `first-last`, e.g. `2021-2023`.
    pub year_range: String,
    pub total_categories: usize,
    pub esg_summary: EsgSummary,
    pub sdg_summary: SdgSummary,
}

fn count<K>(entries: &BTreeMap<K, TrendEntry>, trend: Trend) -> usize {
    entries.values().filter(|e| e.trend == trend).count()
}

/// Count improving and declining entries in `trends`.
#[must_use]
pub fn summarize(trends: &Trends) -> ComparisonSummary {
    let year_range = match (trends.years.first(), trends.years.last()) {
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => String::new(),
    };

    ComparisonSummary {
        total_years_compared: trends.years.len(),
        year_range,
        total_categories: trends.esg_trends.len(),
        esg_summary: EsgSummary {
            improving_categories: count(&trends.esg_trends, Trend::Improving),
            declining_categories: count(&trends.esg_trends, Trend::Declining),
        },
        sdg_summary: SdgSummary {
            improving_sdgs: count(&trends.sdg_trends, Trend::Improving),
            declining_sdgs: count(&trends.sdg_trends, Trend::Declining),
            total_active_sdgs: trends.sdg_trends.len(),
        },
    }
}

/// Year-over-year comparison of one company's analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub company_name: String,
    /// Ascending.
    pub years_compared: Vec<i32>,
    pub esg_trends: BTreeMap<EsgCategory, TrendEntry>,
    pub sdg_trends: BTreeMap<SdgId, TrendEntry>,
    pub summary: ComparisonSummary,
}

impl ComparisonResult {
    /// Compute trends and summary for `company_name`.
    ///
    /// # Errors
    /// Fails when fewer than two years are given.
    pub fn build(
        company_name: impl Into<String>,
        results_by_year: &BTreeMap<i32, AnalysisResult>,
    ) -> Result<Self> {
        let trends = compute_trends(results_by_year)?;
        let summary = summarize(&trends);
        let Trends {
            years,
            esg_trends,
            sdg_trends,
        } = trends;

        Ok(Self {
            company_name: company_name.into(),
            years_compared: years,
            esg_trends,
            sdg_trends,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::types::SdgResult;
    use pretty_assertions::assert_eq;

    fn result(scores: [f64; 3], sdgs: &[(u8, f64)]) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        for (category, score) in EsgCategory::ALL.into_iter().zip(scores) {
            result.esg_analysis.get_mut(category).score = score;
        }
        for (n, score) in sdgs {
            let id = SdgId::new(*n).unwrap();
            result.sdg_mapping.set(
                id,
                SdgResult {
                    score: *score,
                    ..SdgResult::default()
                },
            );
        }
        result
    }

    #[test]
    fn test_summary_counts() {
        let results = BTreeMap::from([
            (2021, result([5.0, 6.0, 7.0], &[(3, 2.0), (7, 8.0)])),
            (2022, result([5.5, 6.0, 6.0], &[(3, 4.0)])),
            (2023, result([6.0, 7.5, 6.5], &[(3, 5.0), (7, 8.0)])),
        ]);
        let comparison = ComparisonResult::build("Acme", &results).unwrap();

        assert_eq!(
            comparison.summary,
            ComparisonSummary {
                total_years_compared: 3,
                year_range: "2021-2023".into(),
                total_categories: 3,
                esg_summary: EsgSummary {
                    improving_categories: 2,
                    declining_categories: 1,
                },
                sdg_summary: SdgSummary {
                    improving_sdgs: 1,
                    declining_sdgs: 1,
                    total_active_sdgs: 2,
                },
            }
        );
        assert_eq!(comparison.years_compared, vec![2021, 2022, 2023]);
        assert_eq!(comparison.company_name, "Acme");
    }

    #[test]
    fn test_esg_counts_sum_to_three() {
        let results = BTreeMap::from([
            (2022, result([0.0, 0.0, 0.0], &[])),
            (2023, result([0.0, 0.0, 0.0], &[])),
        ]);
        let summary = ComparisonResult::build("Acme", &results).unwrap().summary;
        assert_eq!(
            summary.esg_summary.improving_categories + summary.esg_summary.declining_categories,
            3
        );
        assert_eq!(summary.sdg_summary.total_active_sdgs, 0);
    }

    #[test]
    fn test_scenario_environmental_improvement() {
        let results = BTreeMap::from([
            (2022, result([0.0, 6.0, 0.0], &[])),
            (2023, result([0.0, 7.5, 0.0], &[])),
        ]);
        let comparison = ComparisonResult::build("Acme", &results).unwrap();
        let entry = &comparison.esg_trends[&EsgCategory::Environmental];
        assert_eq!(entry.change, 1.5);
        assert_eq!(entry.trend, Trend::Improving);
        assert_eq!(comparison.summary.esg_summary.improving_categories, 1);
    }

    #[test]
    fn test_build_requires_two_years() {
        let results = BTreeMap::from([(2023, AnalysisResult::default())]);
        assert_eq!(
            ComparisonResult::build("Acme", &results),
            Err(AnalysisError::InsufficientData { years: 1 })
        );
    }

    #[test]
    fn test_comparison_serializes_with_string_keys() {
        let results = BTreeMap::from([
            (2022, result([1.0, 2.0, 3.0], &[(7, 6.0)])),
            (2023, result([2.0, 2.0, 3.0], &[(7, 9.0)])),
        ]);
        let json = serde_json::to_value(ComparisonResult::build("Acme", &results).unwrap()).unwrap();
        assert_eq!(json["esg_trends"]["economic_financial_performance"]["trend"], "improving");
        assert_eq!(json["sdg_trends"]["sdg_7"]["scores"]["2023"], 9.0);
        assert_eq!(json["summary"]["year_range"], "2022-2023");
    }
}
