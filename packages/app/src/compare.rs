//! Year-over-year comparison of stored reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use compass_analysis::{AnalysisResult, ComparisonResult};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::{LlmClient, LlmRequest};
use crate::config::LlmConfig;
use crate::error::Result;
use crate::prompt;
use crate::store::ReportStore;

/// A comparison together with the analyses it was computed from.
#[derive(Debug, Clone)]
pub struct CompanyComparison {
    pub comparison: ComparisonResult,
    pub results_by_year: BTreeMap<i32, AnalysisResult>,
}

/// Comparison as written to disk or stdout.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    #[serde(flatten)]
    pub comparison: ComparisonResult,
    pub comparison_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl ComparisonReport {
    pub fn new(comparison: ComparisonResult, narrative: Option<String>) -> Self {
        Self {
            comparison,
            comparison_date: Utc::now(),
            narrative,
        }
    }
}

/// Compare the stored reports of `company`.
///
/// Uses every stored year when `years` is empty. Requested years without a
/// stored report are skipped with a warning; at least two must remain.
pub fn compare_company(
    store: &ReportStore,
    company: &str,
    years: &[i32],
) -> Result<CompanyComparison> {
    let mut reports = store.company_reports(company)?;
    if !years.is_empty() {
        for year in years {
            if !reports.contains_key(year) {
                warn!(company, year, "no stored report for requested year");
            }
        }
        reports.retain(|year, _| years.contains(year));
    }

    // Name as the user last typed it, not the directory key
    let display_name = reports
        .values()
        .next_back()
        .map_or_else(|| company.trim().to_string(), |r| r.company_name.clone());

    let results_by_year: BTreeMap<i32, AnalysisResult> = reports
        .into_iter()
        .map(|(year, report)| (year, report.analysis_results))
        .collect();

    let comparison = ComparisonResult::build(display_name, &results_by_year)?;
    info!(
        company,
        years = ?comparison.years_compared,
        improving_esg = comparison.summary.esg_summary.improving_categories,
        active_sdgs = comparison.summary.sdg_summary.total_active_sdgs,
        "Compared reports"
    );

    Ok(CompanyComparison {
        comparison,
        results_by_year,
    })
}

/// Ask the model for a narrative of the comparison.
///
/// A failed request is logged and yields `None`; the numeric comparison
/// stands on its own.
pub fn generate_narrative<C: LlmClient>(
    client: &C,
    config: &LlmConfig,
    comparison: &CompanyComparison,
) -> Option<String> {
    let request = LlmRequest {
        system: prompt::build_comparison_system_prompt().to_string(),
        prompt: prompt::build_comparison_prompt(
            &comparison.comparison,
            &comparison.results_by_year,
        ),
        max_output_tokens: config.max_output_tokens,
        temperature: config.temperature,
    };

    match client.complete(&request) {
        Ok(response) => {
            let text = response.content.trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        Err(e) => {
            warn!(
                company = %comparison.comparison.company_name,
                error = %e,
                "comparison narrative failed"
            );
            None
        }
    }
}
