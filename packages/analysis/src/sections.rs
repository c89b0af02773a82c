//! Qualitative field extraction from model responses.
//!
//! Works on the heading structure of the response: the executive summary is
//! the text under its level-2 heading up to the next heading, ESG categories
//! are level-3 blocks, SDGs are level-4 blocks and recommendations are
//! `Priority n` level-3 blocks. Every field is best effort and defaults to
//! empty.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::MAX_RECOMMENDATIONS;
use crate::markdown::{
    block_body, block_with_heading, collapse_whitespace, headings, label_regex, labelled_span,
    list_items, strip_bold_spans, Heading, SpanEnd,
};
use crate::scores::parse_score_token;
use crate::types::{EsgCategory, SdgId};

/// First `Score: x` in a block.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Score:\s*\**\s*(\d+(?:\.\d+)?)").expect("valid regex")
});

/// SDG heading title: `SDG n: name (Score: x)`.
#[allow(clippy::expect_used)]
static SDG_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SDG\s*(\d{1,2})\s*:\s*([^()]+?)\s*\(\s*Score:\s*(\d+(?:\.\d+)?)")
        .expect("valid regex")
});

/// Recommendation heading title: `Priority n: title`.
#[allow(clippy::expect_used)]
static PRIORITY_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\W*Priority\s*\d+\s*:\s*(.*)$").expect("valid regex"));

/// Field labels inside ESG and SDG blocks.
struct Labels {
    strengths: Regex,
    weaknesses: Regex,
    esg_evidence: Regex,
    contribution: Regex,
    sdg_evidence: Regex,
    improvement: Regex,
}

#[allow(clippy::expect_used)]
static LABELS: LazyLock<Labels> = LazyLock::new(|| Labels {
    strengths: label_regex(r"Key\s+Strengths|Strengths").expect("valid regex"),
    weaknesses: label_regex(r"Areas\s+for\s+Improvement|Weaknesses").expect("valid regex"),
    esg_evidence: label_regex(r"Supporting\s+Evidence").expect("valid regex"),
    contribution: label_regex(r"Contribution").expect("valid regex"),
    sdg_evidence: label_regex(r"Evidence").expect("valid regex"),
    improvement: label_regex(r"Improvement|Enhancement").expect("valid regex"),
});

/// Details found in an ESG category block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EsgSection {
    pub score: Option<f64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub evidence: String,
}

/// Details found in an SDG block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SdgSection {
    pub score: Option<f64>,
    pub name: String,
    pub contributions: Vec<String>,
    pub evidence: String,
    pub improvement_areas: Vec<String>,
}

/// Qualitative content of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sections {
    /// Empty when the response has no executive summary.
    pub executive_summary: String,
    pub esg: BTreeMap<EsgCategory, EsgSection>,
    pub sdg: BTreeMap<SdgId, SdgSection>,
    pub recommendations: Vec<String>,
    pub kpis_assessment: Option<String>,
    pub compliance_assessment: Option<String>,
}

/// Extract every qualitative section from `text`.
///
/// Never fails; missing headings and labels leave their fields empty.
#[must_use]
pub fn extract_sections(text: &str) -> Sections {
    let found = headings(text);

    Sections {
        executive_summary: executive_summary(text, &found),
        esg: esg_sections(text, &found),
        sdg: sdg_sections(text, &found),
        recommendations: recommendations(text, &found),
        kpis_assessment: raw_level2_section(text, &found, "key performance indicators"),
        compliance_assessment: raw_level2_section(text, &found, "compliance"),
    }
}

fn find_level2(found: &[Heading<'_>], needle: &str) -> Option<usize> {
    found
        .iter()
        .position(|h| h.level == 2 && h.title.to_lowercase().contains(needle))
}

/// Body up to the next heading of any level.
fn executive_summary(text: &str, found: &[Heading<'_>]) -> String {
    find_level2(found, "executive summary")
        .map(|i| block_body(text, found, i, 6).trim().to_string())
        .unwrap_or_default()
}

fn raw_level2_section(text: &str, found: &[Heading<'_>], needle: &str) -> Option<String> {
    find_level2(found, needle)
        .map(|i| block_with_heading(text, found, i, 2).trim().to_string())
}

fn esg_sections(text: &str, found: &[Heading<'_>]) -> BTreeMap<EsgCategory, EsgSection> {
    let labels = &*LABELS;
    let mut sections = BTreeMap::new();

    for category in EsgCategory::ALL {
        let keyword = category.keyword().to_lowercase();
        let Some(index) = found
            .iter()
            .position(|h| h.level == 3 && h.title.to_lowercase().contains(&keyword))
        else {
            continue;
        };

        let block = block_with_heading(text, found, index, 3);
        let section = EsgSection {
            score: first_score(block),
            strengths: labelled_span(block, &labels.strengths, SpanEnd::NextLabel)
                .map(list_items)
                .unwrap_or_default(),
            weaknesses: labelled_span(block, &labels.weaknesses, SpanEnd::NextLabel)
                .map(list_items)
                .unwrap_or_default(),
            evidence: labelled_span(block, &labels.esg_evidence, SpanEnd::NextLabel)
                .map(collapse_whitespace)
                .unwrap_or_default(),
        };
        sections.insert(category, section);
    }

    sections
}

fn sdg_sections(text: &str, found: &[Heading<'_>]) -> BTreeMap<SdgId, SdgSection> {
    let labels = &*LABELS;
    let mut sections = BTreeMap::new();

    for (index, heading) in found.iter().enumerate() {
        if !(3..=4).contains(&heading.level) {
            continue;
        }
        let Some(caps) = SDG_HEADING_RE.captures(heading.title) else {
            continue;
        };
        let Some(id) = caps.get(1).and_then(|m| SdgId::parse_number(m.as_str())) else {
            continue;
        };
        if sections.contains_key(&id) {
            continue;
        }

        let body = block_body(text, found, index, heading.level);
        let span = |label: &Regex| labelled_span(body, label, SpanEnd::NextLabelOrBlankLine);

        let section = SdgSection {
            score: caps.get(3).and_then(|m| parse_score_token(m.as_str())),
            name: caps
                .get(2)
                .map(|m| collapse_whitespace(m.as_str()))
                .unwrap_or_default(),
            contributions: span(&labels.contribution).map(list_items).unwrap_or_default(),
            evidence: span(&labels.sdg_evidence)
                .map(collapse_whitespace)
                .unwrap_or_default(),
            improvement_areas: span(&labels.improvement).map(list_items).unwrap_or_default(),
        };
        sections.insert(id, section);
    }

    sections
}

fn recommendations(text: &str, found: &[Heading<'_>]) -> Vec<String> {
    found
        .iter()
        .enumerate()
        .filter(|(_, h)| h.level == 3)
        .filter_map(|(index, heading)| {
            let title = PRIORITY_HEADING_RE
                .captures(heading.title)
                .and_then(|caps| caps.get(1))?
                .as_str();
            let body = block_body(text, found, index, 3);
            let combined = format!("{title}\n{body}");
            let cleaned = collapse_whitespace(&strip_bold_spans(&combined));
            (!cleaned.is_empty()).then_some(cleaned)
        })
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

fn first_score(block: &str) -> Option<f64> {
    SCORE_RE
        .captures(block)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_score_token(m.as_str()))
}
