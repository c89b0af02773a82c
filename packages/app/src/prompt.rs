use std::collections::BTreeMap;

use compass_analysis::{AnalysisResult, ComparisonResult, DocumentContent, EsgCategory, Language};

const SYSTEM_ANALYSIS: &str = include_str!("../prompts/system_analysis.txt");
const REPORT_TEMPLATE: &str = include_str!("../prompts/report_template.md");
const SYSTEM_COMPARISON: &str = include_str!("../prompts/system_comparison.txt");
const COMPARISON_REQUIREMENTS: &str = include_str!("../prompts/comparison_requirements.md");

/// Characters of each year's executive summary quoted in comparison prompts.
const SUMMARY_EXCERPT_CHARS: usize = 200;

/// Build the system prompt for report analysis.
pub fn build_system_prompt() -> &'static str {
    SYSTEM_ANALYSIS
}

/// Build the system prompt for comparison narratives.
pub fn build_comparison_system_prompt() -> &'static str {
    SYSTEM_COMPARISON
}

fn language_instruction(language: Language) -> &'static str {
    match language {
        Language::En => "Please provide your complete analysis in English.",
        Language::Ar => "يرجى تقديم التحليل الكامل باللغة العربية. Keep the Markdown headings, labels and `(Score: X/10)` suffixes exactly as shown in the template.",
    }
}

/// Build the user prompt for analyzing a whole document.
pub fn build_analysis_prompt(document: &DocumentContent, output_language: Language) -> String {
    let mut prompt = String::new();

    prompt.push_str(language_instruction(output_language));
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "You are given the complete sustainability report ({} pages, {} characters, detected language: {}).",
        document.page_count,
        document.text.chars().count(),
        document.language_detected.display_name()
    ));
    if !document.tables.is_empty() {
        prompt.push_str(&format!(
            " The document also contains {} tables with structured data.",
            document.tables.len()
        ));
    }
    prompt.push_str("\n\n");

    prompt.push_str(
        "Write a sustainability analysis report in Markdown that follows this template exactly. \
         Replace every X with a score from 0 to 10 and every bracketed placeholder with content \
         from the document. Include one `#### SDG` section for every SDG the company contributes to.\n\n",
    );
    prompt.push_str(REPORT_TEMPLATE);
    prompt.push_str("\n---\n\n");

    prompt.push_str("# Document content\n\n");
    prompt.push_str(&document.text);
    prompt.push_str("\n\n");

    prompt.push_str(
        "Base the analysis entirely on the document above. \
         Use specific data, quotes and evidence, and give realistic scores.",
    );

    prompt
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SUMMARY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SUMMARY_EXCERPT_CHARS).collect();
    format!("{cut}...")
}

/// Build the user prompt for a narrative comparison across years.
pub fn build_comparison_prompt(
    comparison: &ComparisonResult,
    results_by_year: &BTreeMap<i32, AnalysisResult>,
) -> String {
    let mut prompt = String::new();
    let years: Vec<String> = comparison
        .years_compared
        .iter()
        .map(ToString::to_string)
        .collect();

    prompt.push_str("# Sustainability Report Comparison Analysis\n\n");
    prompt.push_str(&format!(
        "Analyze the sustainability performance trends for **{}** across the years {}.\n\n",
        comparison.company_name,
        years.join(", ")
    ));

    // ESG table
    prompt.push_str("## ESG Performance Data\n\n");
    prompt.push_str(&format!("| Category | {} | Change |\n", years.join(" | ")));
    prompt.push_str(&format!("|---|{}---|\n", "---|".repeat(years.len())));
    for category in EsgCategory::ALL {
        let Some(entry) = comparison.esg_trends.get(&category) else {
            continue;
        };
        let cells: Vec<String> = comparison
            .years_compared
            .iter()
            .map(|y| entry.scores.get(y).map_or("-".into(), |s| format!("{s:.1}")))
            .collect();
        prompt.push_str(&format!(
            "| {} | {} | {:+.1} ({}) |\n",
            category.title(),
            cells.join(" | "),
            entry.change,
            entry.trend.as_str()
        ));
    }
    prompt.push('\n');

    // SDG table, active goals only
    prompt.push_str("## SDG Performance Data\n\n");
    if comparison.sdg_trends.is_empty() {
        prompt.push_str("No SDG was scored in any of the compared years.\n\n");
    } else {
        prompt.push_str(&format!("| SDG | {} | Change |\n", years.join(" | ")));
        prompt.push_str(&format!("|---|{}---|\n", "---|".repeat(years.len())));
        for (id, entry) in &comparison.sdg_trends {
            let cells: Vec<String> = comparison
                .years_compared
                .iter()
                .map(|y| entry.scores.get(y).map_or("-".into(), |s| format!("{s:.1}")))
                .collect();
            prompt.push_str(&format!(
                "| SDG {}: {} | {} | {:+.1} ({}) |\n",
                id.number(),
                id.canonical_name(),
                cells.join(" | "),
                entry.change,
                entry.trend.as_str()
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str("## Executive Summaries by Year\n\n");
    for year in &comparison.years_compared {
        let summary = results_by_year
            .get(year)
            .map(|r| r.executive_summary.as_str())
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| "Not available".to_string(), excerpt);
        prompt.push_str(&format!("**{year}:** {summary}\n\n"));
    }

    prompt.push_str(COMPARISON_REQUIREMENTS);
    prompt.push_str(
        "\nStructure your response with clear headings and give specific, \
         actionable insights based on the data trends.",
    );

    prompt
}
