//! Merge extracted scores and sections into a complete [`AnalysisResult`].

use tracing::{debug, warn};

use crate::config::{clamp_score, MAX_RECOMMENDATIONS};
use crate::scores::{extract_scores, ScoreMap};
use crate::sections::{extract_sections, Sections};
use crate::types::{
    AnalysisResult, EsgAnalysis, EsgCategory, EsgCategoryResult, SdgId, SdgMapping, SdgResult,
};

/// Combine scores and sections into a result with every ESG category and SDG present.
///
/// Scores come from `scores` first, then from the matching section, then
/// default to 0. All scores are clamped to `[0, 10]` and every SDG impact
/// level is derived from its score. `raw_response` is kept on the result.
#[must_use]
pub fn normalize(scores: &ScoreMap, sections: Sections, raw_response: &str) -> AnalysisResult {
    let Sections {
        executive_summary,
        mut esg,
        mut sdg,
        mut recommendations,
        kpis_assessment,
        compliance_assessment,
    } = sections;

    let mut esg_analysis = EsgAnalysis::default();
    for category in EsgCategory::ALL {
        let section = esg.remove(&category).unwrap_or_default();
        let score = scores.esg(category).or(section.score).unwrap_or(0.0);
        *esg_analysis.get_mut(category) = EsgCategoryResult {
            score: clamp_score(score),
            strengths: section.strengths,
            weaknesses: section.weaknesses,
            evidence: section.evidence,
        };
    }

    let mut sdg_mapping = SdgMapping::default();
    for id in SdgId::all() {
        let section = sdg.remove(&id).unwrap_or_default();
        let score = scores.sdg(id).or(section.score).unwrap_or(0.0);
        let name = if section.name.is_empty() {
            id.canonical_name().to_string()
        } else {
            section.name
        };
        sdg_mapping.set(
            id,
            SdgResult {
                score,
                name,
                contributions: section.contributions,
                evidence: section.evidence,
                improvement_areas: section.improvement_areas,
                ..SdgResult::default()
            },
        );
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);

    AnalysisResult {
        executive_summary,
        esg_analysis,
        sdg_mapping,
        recommendations,
        kpis_assessment,
        compliance_assessment,
        analysis_metadata: None,
        raw_response: raw_response.to_string(),
    }
}

/// Parse a model response into a complete [`AnalysisResult`].
///
/// Never fails. A response with no recognizable structure yields a result
/// with every score at 0 and every list empty.
///
/// # Examples
/// ```
/// use compass_analysis::{analyze_response, EsgCategory};
///
/// let result = analyze_response("lorem ipsum");
/// assert_eq!(result.sdg_mapping.iter().count(), 17);
/// assert_eq!(result.esg_analysis.get(EsgCategory::Social).score, 0.0);
/// ```
#[must_use]
pub fn analyze_response(text: &str) -> AnalysisResult {
    let scores = extract_scores(text);
    let sections = extract_sections(text);
    let result = normalize(&scores, sections, text);

    let coverage = result.coverage();
    if coverage.is_empty() {
        warn!(length = text.len(), "no analysis content found in response");
    } else {
        debug!(
            esg_scored = coverage.esg_scored,
            sdgs_scored = coverage.sdgs_scored,
            recommendations = coverage.recommendations,
            "response normalized"
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::ScoreKey;
    use crate::sections::{EsgSection, SdgSection};
    use crate::types::ImpactLevel;
    use pretty_assertions::assert_eq;

    fn sdg(n: u8) -> SdgId {
        SdgId::new(n).unwrap()
    }

    #[test]
    fn test_score_map_wins_over_section() {
        let mut scores = ScoreMap::new();
        scores.insert_if_absent(ScoreKey::Sdg(sdg(7)), 9.0);
        let mut sections = Sections::default();
        sections.sdg.insert(
            sdg(7),
            SdgSection {
                score: Some(3.0),
                name: "Clean Energy".into(),
                ..SdgSection::default()
            },
        );

        let result = normalize(&scores, sections, "");
        let energy = result.sdg_mapping.get(sdg(7));
        assert_eq!(energy.score, 9.0);
        assert_eq!(energy.name, "Clean Energy");
        assert_eq!(energy.impact_level, ImpactLevel::High);
    }

    #[test]
    fn test_section_score_used_when_map_misses() {
        let mut sections = Sections::default();
        sections.esg.insert(
            EsgCategory::Social,
            EsgSection {
                score: Some(4.5),
                strengths: vec!["Training".into()],
                ..EsgSection::default()
            },
        );

        let result = normalize(&ScoreMap::new(), sections, "");
        let social = result.esg_analysis.get(EsgCategory::Social);
        assert_eq!(social.score, 4.5);
        assert_eq!(social.strengths, vec!["Training"]);
    }

    #[test]
    fn test_scores_are_clamped() {
        let mut scores = ScoreMap::new();
        scores.insert_if_absent(ScoreKey::Esg(EsgCategory::Environmental), 85.0);
        scores.insert_if_absent(ScoreKey::Sdg(sdg(2)), -3.0);
        scores.insert_if_absent(ScoreKey::Sdg(sdg(3)), f64::NAN);

        let result = normalize(&scores, Sections::default(), "");
        assert_eq!(result.esg_analysis.get(EsgCategory::Environmental).score, 10.0);
        assert_eq!(result.sdg_mapping.get(sdg(2)).score, 0.0);
        assert_eq!(result.sdg_mapping.get(sdg(3)).score, 0.0);
        assert_eq!(result.sdg_mapping.get(sdg(3)).impact_level, ImpactLevel::None);
    }

    #[test]
    fn test_missing_names_use_canonical_titles() {
        let result = normalize(&ScoreMap::new(), Sections::default(), "");
        assert_eq!(result.sdg_mapping.get(sdg(16)).name, "Peace, Justice and Strong Institutions");
    }

    #[test]
    fn test_scenario_minimal_markup() {
        let text = "### 💼 Economic... Score: 8\n...SDG 7: Affordable Energy (Score: 9)\n";
        let result = analyze_response(text);

        assert_eq!(result.esg_analysis.get(EsgCategory::EconomicFinancial).score, 8.0);
        let energy = result.sdg_mapping.get(sdg(7));
        assert_eq!(energy.score, 9.0);
        assert_eq!(energy.impact_level, ImpactLevel::High);

        for (id, entry) in result.sdg_mapping.iter().filter(|(id, _)| *id != sdg(7)) {
            assert_eq!(entry.score, 0.0, "{id} should be unscored");
            assert_eq!(entry.impact_level, ImpactLevel::None);
        }
    }

    #[test]
    fn test_scenario_unstructured_input() {
        let result = analyze_response("lorem ipsum");
        assert_eq!(result.executive_summary, "");
        assert!(result.recommendations.is_empty());
        assert!(result.esg_analysis.iter().all(|(_, r)| r.score == 0.0
            && r.strengths.is_empty()
            && r.weaknesses.is_empty()
            && r.evidence.is_empty()));
        assert!(result.sdg_mapping.iter().all(|(_, r)| r.score == 0.0
            && r.contributions.is_empty()
            && r.improvement_areas.is_empty()));
        assert_eq!(result.raw_response, "lorem ipsum");
        assert!(result.coverage().is_empty());
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let text = "## Executive Summary\nFine.\n#### SDG 4: Quality Education (Score: 5)\nSDG 9: Industry - 7\n";
        assert_eq!(analyze_response(text), analyze_response(text));
    }
}
