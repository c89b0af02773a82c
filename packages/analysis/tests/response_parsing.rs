//! End-to-end parsing tests over recorded model responses.

use std::fs;
use std::path::Path;

use compass_analysis::{analyze_response, EsgCategory, ImpactLevel, SdgId};
use pretty_assertions::assert_eq;

/// Load fixture file content.
fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

fn sdg(n: u8) -> SdgId {
    SdgId::new(n).expect("valid SDG number")
}

#[test]
fn test_full_response_scores() {
    let result = analyze_response(&load_fixture("full_response.md"));

    assert_eq!(result.esg_analysis.get(EsgCategory::EconomicFinancial).score, 7.5);
    assert_eq!(result.esg_analysis.get(EsgCategory::Environmental).score, 8.0);
    assert_eq!(result.esg_analysis.get(EsgCategory::Social).score, 6.0);

    let scored: Vec<(u8, f64)> = result
        .sdg_mapping
        .iter()
        .filter(|(_, r)| r.score > 0.0)
        .map(|(id, r)| (id.number(), r.score))
        .collect();
    assert_eq!(scored, vec![(6, 3.0), (7, 9.0), (8, 6.5), (13, 7.0)]);
}

#[test]
fn test_full_response_impact_levels() {
    let result = analyze_response(&load_fixture("full_response.md"));
    assert_eq!(result.sdg_mapping.get(sdg(7)).impact_level, ImpactLevel::High);
    assert_eq!(result.sdg_mapping.get(sdg(8)).impact_level, ImpactLevel::Medium);
    assert_eq!(result.sdg_mapping.get(sdg(6)).impact_level, ImpactLevel::Low);
    assert_eq!(result.sdg_mapping.get(sdg(1)).impact_level, ImpactLevel::None);
}

#[test]
fn test_full_response_qualitative_fields() {
    let result = analyze_response(&load_fixture("full_response.md"));

    assert!(result
        .executive_summary
        .starts_with("Gulf Energy Holdings reports measurable progress"));
    assert!(result
        .executive_summary
        .ends_with("lacks third-party assurance for social metrics."));

    let economic = result.esg_analysis.get(EsgCategory::EconomicFinancial);
    assert_eq!(
        economic.strengths,
        vec!["Revenue up 11% year over year", "Green bond issuance of USD 500m"]
    );
    assert_eq!(
        economic.weaknesses,
        vec!["No disclosure of climate-related financial risk", "Limited segment reporting"]
    );
    assert_eq!(
        economic.evidence,
        "Consolidated statements (p. 44) and green financing framework (p. 61)."
    );

    let energy = result.sdg_mapping.get(sdg(7));
    assert_eq!(
        energy.contributions,
        vec![
            "Commissioned two utility-scale solar plants",
            "Rooftop programme for 1,200 homes"
        ]
    );
    assert_eq!(energy.evidence, "Capacity additions table (p. 75).");
    assert_eq!(energy.improvement_areas, vec!["Battery storage pilots."]);

    let climate = result.sdg_mapping.get(sdg(13));
    assert_eq!(climate.improvement_areas, vec!["Align targets with SBTi."]);
}

#[test]
fn test_full_response_recommendations_and_raw_sections() {
    let result = analyze_response(&load_fixture("full_response.md"));

    assert_eq!(
        result.recommendations,
        vec![
            "Obtain external assurance Engage an accredited assurance provider. Cover social and environmental KPIs.",
            "Disclose water metrics by site Report withdrawal, discharge and consumption.",
            "Set science-based targets Submit targets for SBTi validation.",
        ]
    );
    assert_eq!(
        result.compliance_assessment.as_deref(),
        Some("## Compliance and Standards Assessment\nThe report references GRI 2021 and partially follows TCFD.")
    );
    assert!(result
        .kpis_assessment
        .as_deref()
        .is_some_and(|k| k.contains("0.42 to 0.36")));
}

#[test]
fn test_loose_response_uses_lower_tiers() {
    let result = analyze_response(&load_fixture("loose_response.md"));

    let scored: Vec<(u8, f64)> = result
        .sdg_mapping
        .iter()
        .filter(|(_, r)| r.score > 0.0)
        .map(|(id, r)| (id.number(), r.score))
        .collect();
    assert_eq!(
        scored,
        vec![(1, 2.0), (3, 6.0), (4, 5.0), (7, 8.5), (9, 7.0), (11, 5.0), (12, 4.0)]
    );
    assert_eq!(result.sdg_mapping.get(sdg(13)).score, 0.0);
    assert_eq!(result.sdg_mapping.get(sdg(11)).name, "Sustainable Cities and Communities");
}

#[test]
fn test_result_round_trips_through_json() {
    let result = analyze_response(&load_fixture("full_response.md"));
    let json = serde_json::to_string_pretty(&result).expect("serialize");
    let restored: compass_analysis::AnalysisResult = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, result);
}

#[test]
fn test_every_input_is_complete_and_bounded() {
    let inputs = [
        String::new(),
        "lorem ipsum".to_string(),
        "SDG 4: Education (Score: 250)\nSDG 5: Gender - -3\nEconomic Performance Score: 99".to_string(),
        "#### SDG 99: Nothing (Score: 7)\n### Social\nScore: abc".to_string(),
        load_fixture("full_response.md"),
        load_fixture("loose_response.md"),
    ];

    for input in &inputs {
        let result = analyze_response(input);
        assert_eq!(result.esg_analysis.iter().count(), 3);
        assert_eq!(result.sdg_mapping.iter().count(), 17);
        for (_, entry) in result.esg_analysis.iter() {
            assert!((0.0..=10.0).contains(&entry.score));
        }
        for (_, entry) in result.sdg_mapping.iter() {
            assert!((0.0..=10.0).contains(&entry.score));
            assert_eq!(entry.impact_level, ImpactLevel::from_score(entry.score));
        }
        assert!(result.recommendations.len() <= 5);
        assert_eq!(analyze_response(input), result);
    }
}
