//! Core data types for sustainability analyses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::config::{
    clamp_score, HIGH_IMPACT_THRESHOLD, MEDIUM_IMPACT_THRESHOLD, SDG_COUNT, SDG_NAMES,
};
use crate::error::{AnalysisError, Result};

/// Language of a source document or of the requested report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    /// ISO 639-1 code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    /// English name of the language, as used in prompts.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ar => "Arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ar" | "arabic" => Ok(Self::Ar),
            other => Err(format!("unsupported language '{other}', expected 'en' or 'ar'")),
        }
    }
}

/// A table found in a source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    /// 1-based page the table was found on.
    pub page: usize,
    pub rows: Vec<Vec<String>>,
}

/// Text and structure extracted from a sustainability report.
///
/// Only used as prompt context; the parsers never look inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub text: String,
    pub page_count: usize,
    pub tables: Vec<TableRecord>,
    pub language_detected: Language,
}

/// The three ESG categories a report is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EsgCategory {
    #[serde(rename = "economic_financial_performance")]
    EconomicFinancial,
    #[serde(rename = "environmental_performance")]
    Environmental,
    #[serde(rename = "social_performance")]
    Social,
}

impl EsgCategory {
    pub const ALL: [EsgCategory; 3] = [Self::EconomicFinancial, Self::Environmental, Self::Social];

    /// Key used in serialized results.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::EconomicFinancial => "economic_financial_performance",
            Self::Environmental => "environmental_performance",
            Self::Social => "social_performance",
        }
    }

    /// Word that identifies the category's heading in a response.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::EconomicFinancial => "Economic",
            Self::Environmental => "Environmental",
            Self::Social => "Social",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::EconomicFinancial => "Economic & Financial Performance",
            Self::Environmental => "Environmental Performance",
            Self::Social => "Social Performance",
        }
    }
}

impl fmt::Display for EsgCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A UN Sustainable Development Goal number, always in `1..=17`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SdgId(u8);

impl SdgId {
    /// Build an id, returning `None` outside `1..=17`.
    ///
    /// # Examples
    /// ```
    /// use compass_analysis::SdgId;
    ///
    /// assert!(SdgId::new(7).is_some());
    /// assert!(SdgId::new(0).is_none());
    /// assert!(SdgId::new(18).is_none());
    /// ```
    #[must_use]
    pub fn new(number: u8) -> Option<Self> {
        (1..=SDG_COUNT as u8).contains(&number).then_some(Self(number))
    }

    /// Parse a goal number as captured from text ("7", "07").
    #[must_use]
    pub fn parse_number(digits: &str) -> Option<Self> {
        digits.trim().parse::<u8>().ok().and_then(Self::new)
    }

    /// Parse a result key such as `sdg_7`. Also accepts `SDG7`, `sdg 7` and a bare `7`.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let lower = key.trim().to_lowercase();
        let digits = lower.strip_prefix("sdg").unwrap_or(&lower);
        let digits = digits.trim_start_matches(['_', ' ', '-']);
        Self::parse_number(digits)
    }

    /// All 17 goals in ascending order.
    pub fn all() -> impl Iterator<Item = SdgId> {
        (1..=SDG_COUNT as u8).map(Self)
    }

    #[must_use]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Key used in serialized results, e.g. `sdg_7`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("sdg_{}", self.0)
    }

    /// Official UN title of the goal.
    #[must_use]
    pub fn canonical_name(&self) -> &'static str {
        SDG_NAMES[self.index()]
    }

    fn index(&self) -> usize {
        usize::from(self.0) - 1
    }
}

impl TryFrom<u8> for SdgId {
    type Error = AnalysisError;

    fn try_from(number: u8) -> Result<Self> {
        Self::new(number).ok_or(AnalysisError::UnknownSdg(number))
    }
}

impl fmt::Display for SdgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sdg_{}", self.0)
    }
}

impl Serialize for SdgId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SdgId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Self::from_key(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid SDG key '{key}'")))
    }
}

/// Impact bucket derived from an SDG score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// `>= 7` is High, `>= 4` Medium, `> 0` Low, otherwise None.
    ///
    /// # Examples
    /// ```
    /// use compass_analysis::ImpactLevel;
    ///
    /// assert_eq!(ImpactLevel::from_score(7.0), ImpactLevel::High);
    /// assert_eq!(ImpactLevel::from_score(3.9), ImpactLevel::Low);
    /// assert_eq!(ImpactLevel::from_score(0.0), ImpactLevel::None);
    /// ```
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_IMPACT_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_IMPACT_THRESHOLD {
            Self::Medium
        } else if score > 0.0 {
            Self::Low
        } else {
            Self::None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Direction of a score between the first and last compared year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
}

impl Trend {
    /// A positive change is improving. Zero or negative change is declining.
    #[must_use]
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Self::Improving
        } else {
            Self::Declining
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
        }
    }
}

/// Scored assessment of one ESG category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "EsgCategoryRecord")]
pub struct EsgCategoryResult {
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub evidence: String,
}

/// Stored form of [`EsgCategoryResult`], clamped on load.
#[derive(Deserialize, Default)]
#[serde(default)]
struct EsgCategoryRecord {
    score: f64,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    evidence: String,
}

impl From<EsgCategoryRecord> for EsgCategoryResult {
    fn from(record: EsgCategoryRecord) -> Self {
        Self {
            score: clamp_score(record.score),
            strengths: record.strengths,
            weaknesses: record.weaknesses,
            evidence: record.evidence,
        }
    }
}

/// All three ESG category results. Every category is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsgAnalysis {
    pub economic_financial_performance: EsgCategoryResult,
    pub environmental_performance: EsgCategoryResult,
    pub social_performance: EsgCategoryResult,
}

impl EsgAnalysis {
    #[must_use]
    pub fn get(&self, category: EsgCategory) -> &EsgCategoryResult {
        match category {
            EsgCategory::EconomicFinancial => &self.economic_financial_performance,
            EsgCategory::Environmental => &self.environmental_performance,
            EsgCategory::Social => &self.social_performance,
        }
    }

    pub fn get_mut(&mut self, category: EsgCategory) -> &mut EsgCategoryResult {
        match category {
            EsgCategory::EconomicFinancial => &mut self.economic_financial_performance,
            EsgCategory::Environmental => &mut self.environmental_performance,
            EsgCategory::Social => &mut self.social_performance,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EsgCategory, &EsgCategoryResult)> {
        EsgCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Scored assessment of one SDG.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdgResult {
    pub score: f64,
    pub name: String,
    /// Derived from `score`; recomputed whenever a result is loaded.
    #[serde(skip_deserializing)]
    pub impact_level: ImpactLevel,
    pub contributions: Vec<String>,
    pub evidence: String,
    pub improvement_areas: Vec<String>,
}

impl SdgResult {
    /// A zero-scored result carrying the goal's canonical name.
    #[must_use]
    pub fn empty(id: SdgId) -> Self {
        Self {
            name: id.canonical_name().to_string(),
            ..Self::default()
        }
    }

    /// Clamp the score, derive the impact level and fill a missing name.
    fn settle(mut self, id: SdgId) -> Self {
        self.score = clamp_score(self.score);
        self.impact_level = ImpactLevel::from_score(self.score);
        if self.name.trim().is_empty() {
            self.name = id.canonical_name().to_string();
        }
        self
    }
}

/// Results for all 17 SDGs, indexed by [`SdgId`].
///
/// Serializes as a map `sdg_1`..`sdg_17`. Deserializing tolerates missing
/// and legacy keys, so a loaded mapping is always complete.
#[derive(Debug, Clone, PartialEq)]
pub struct SdgMapping([SdgResult; SDG_COUNT]);

impl SdgMapping {
    #[must_use]
    pub fn get(&self, id: SdgId) -> &SdgResult {
        &self.0[id.index()]
    }

    /// Replace the result for `id`, clamping its score and deriving its impact level.
    pub fn set(&mut self, id: SdgId, result: SdgResult) {
        self.0[id.index()] = result.settle(id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (SdgId, &SdgResult)> {
        SdgId::all().zip(self.0.iter())
    }

    /// Number of goals with a non-zero score.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|r| r.score > 0.0).count()
    }
}

impl Default for SdgMapping {
    fn default() -> Self {
        Self(std::array::from_fn(|i| {
            SdgResult::empty(SdgId(i as u8 + 1))
        }))
    }
}

impl Serialize for SdgMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SDG_COUNT))?;
        for (id, result) in self.iter() {
            map.serialize_entry(&id.key(), result)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SdgMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, SdgResult>::deserialize(deserializer)?;
        let mut mapping = Self::default();
        for (key, result) in raw {
            if let Some(id) = SdgId::from_key(&key) {
                mapping.set(id, result);
            }
        }
        Ok(mapping)
    }
}

/// Context recorded alongside an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_date: DateTime<Utc>,
    #[serde(default)]
    pub document_pages: usize,
    #[serde(default)]
    pub content_length: usize,
    #[serde(default)]
    pub tables_processed: usize,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub model_used: String,
}

/// Normalized analysis of one company report for one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub executive_summary: String,
    pub esg_analysis: EsgAnalysis,
    pub sdg_mapping: SdgMapping,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpis_assessment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_assessment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_metadata: Option<AnalysisMetadata>,
    /// The response text the result was extracted from.
    pub raw_response: String,
}

impl AnalysisResult {
    /// How much of the result carries extracted content.
    #[must_use]
    pub fn coverage(&self) -> Coverage {
        Coverage {
            esg_scored: self.esg_analysis.iter().filter(|(_, r)| r.score > 0.0).count(),
            sdgs_scored: self.sdg_mapping.active_count(),
            has_summary: !self.executive_summary.is_empty(),
            recommendations: self.recommendations.len(),
        }
    }
}

/// Extraction coverage of an [`AnalysisResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub esg_scored: usize,
    pub sdgs_scored: usize,
    pub has_summary: bool,
    pub recommendations: usize,
}

impl Coverage {
    /// True when nothing at all was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.esg_scored == 0 && self.sdgs_scored == 0 && !self.has_summary && self.recommendations == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sdg_id_keys() {
        let id = SdgId::new(7).unwrap();
        assert_eq!(id.key(), "sdg_7");
        assert_eq!(id.to_string(), "sdg_7");
        assert_eq!(id.canonical_name(), "Affordable and Clean Energy");
    }

    #[test]
    fn test_sdg_id_from_legacy_keys() {
        assert_eq!(SdgId::from_key("sdg_13").map(|i| i.number()), Some(13));
        assert_eq!(SdgId::from_key("SDG7").map(|i| i.number()), Some(7));
        assert_eq!(SdgId::from_key("sdg 4").map(|i| i.number()), Some(4));
        assert_eq!(SdgId::from_key("sdg_18"), None);
        assert_eq!(SdgId::from_key("goal"), None);
    }

    #[test]
    fn test_sdg_id_try_from() {
        assert_eq!(SdgId::try_from(0), Err(AnalysisError::UnknownSdg(0)));
        assert!(SdgId::try_from(17).is_ok());
    }

    #[test]
    fn test_impact_level_boundaries() {
        assert_eq!(ImpactLevel::from_score(10.0), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(6.99), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(4.0), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(0.1), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(0.0), ImpactLevel::None);
    }

    #[test]
    fn test_impact_level_as_str_matches_serialized() {
        for level in [
            ImpactLevel::None,
            ImpactLevel::Low,
            ImpactLevel::Medium,
            ImpactLevel::High,
        ] {
            assert_eq!(serde_json::to_value(level).unwrap(), level.as_str());
        }
    }

    #[test]
    fn test_trend_from_change() {
        assert_eq!(Trend::from_change(0.5), Trend::Improving);
        assert_eq!(Trend::from_change(0.0), Trend::Declining);
        assert_eq!(Trend::from_change(-2.0), Trend::Declining);
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("AR".parse::<Language>(), Ok(Language::Ar));
        assert_eq!("english".parse::<Language>(), Ok(Language::En));
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_default_mapping_is_complete() {
        let mapping = SdgMapping::default();
        assert_eq!(mapping.iter().count(), 17);
        assert_eq!(mapping.get(SdgId::new(1).unwrap()).name, "No Poverty");
        assert_eq!(mapping.active_count(), 0);
    }

    #[test]
    fn test_mapping_set_settles_result() {
        let mut mapping = SdgMapping::default();
        let id = SdgId::new(13).unwrap();
        mapping.set(
            id,
            SdgResult {
                score: 14.0,
                impact_level: ImpactLevel::Low,
                ..SdgResult::default()
            },
        );
        let result = mapping.get(id);
        assert_eq!(result.score, 10.0);
        assert_eq!(result.impact_level, ImpactLevel::High);
        assert_eq!(result.name, "Climate Action");
    }

    #[test]
    fn test_mapping_serializes_all_keys() {
        let json = serde_json::to_value(SdgMapping::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 17);
        assert!(object.contains_key("sdg_1"));
        assert!(object.contains_key("sdg_17"));
        assert_eq!(json["sdg_5"]["impact_level"], "None");
    }

    #[test]
    fn test_mapping_deserializes_partial_legacy_json() {
        let json = serde_json::json!({
            "SDG7": {"score": 8.5, "impact_level": "Very High"},
            "sdg_3": {"score": -2, "name": "Health"},
            "unrelated": {"score": 9}
        });
        let mapping: SdgMapping = serde_json::from_value(json).unwrap();

        let sdg7 = mapping.get(SdgId::new(7).unwrap());
        assert_eq!(sdg7.score, 8.5);
        assert_eq!(sdg7.impact_level, ImpactLevel::High);
        assert_eq!(sdg7.name, "Affordable and Clean Energy");

        let sdg3 = mapping.get(SdgId::new(3).unwrap());
        assert_eq!(sdg3.score, 0.0);
        assert_eq!(sdg3.name, "Health");
        assert_eq!(mapping.active_count(), 1);
    }

    #[test]
    fn test_analysis_result_deserializes_from_empty_object() {
        let result: AnalysisResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result.sdg_mapping.iter().count(), 17);
        assert_eq!(result.esg_analysis.iter().count(), 3);
        assert!(result.coverage().is_empty());
    }

    #[test]
    fn test_esg_scores_clamped_on_load() {
        let json = serde_json::json!({
            "esg_analysis": {"social_performance": {"score": 42.0}}
        });
        let result: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.esg_analysis.get(EsgCategory::Social).score, 10.0);
    }

    #[test]
    fn test_esg_category_serializes_as_key() {
        let json = serde_json::to_string(&EsgCategory::Environmental).unwrap();
        assert_eq!(json, "\"environmental_performance\"");
    }
}
