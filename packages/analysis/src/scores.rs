//! Score extraction from model responses.
//!
//! Scores are pulled out by an ordered pipeline of tiers. Each tier is a pure
//! function from text to a partial [`ScoreMap`]; the extractor merges them so
//! that the first tier to produce a key keeps it. Later tiers only run when the
//! earlier ones found too few SDGs, and they never override.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::config::{
    AMBIGUOUS_SCORE, FALLBACK_TIER_THRESHOLD, LOOSE_TIER_THRESHOLD, MAX_SCORE, MIN_SCORE,
};
use crate::types::{EsgCategory, SdgId};

/// Key of an extracted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScoreKey {
    Esg(EsgCategory),
    Sdg(SdgId),
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esg(category) => write!(f, "esg_{}", category.key()),
            Self::Sdg(id) => write!(f, "{id}"),
        }
    }
}

/// Scores found in a response, keyed by ESG category or SDG.
///
/// Values are stored as written in the response; clamping happens during
/// normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap {
    entries: BTreeMap<ScoreKey, f64>,
}

impl ScoreMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `score` unless `key` already has one. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: ScoreKey, score: f64) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, score);
        true
    }

    /// Copy every entry of `other` whose key is not yet present.
    ///
    /// Returns the number of keys filled.
    pub fn fill_from(&mut self, other: ScoreMap) -> usize {
        other
            .entries
            .into_iter()
            .filter(|(key, score)| self.insert_if_absent(*key, *score))
            .count()
    }

    #[must_use]
    pub fn get(&self, key: ScoreKey) -> Option<f64> {
        self.entries.get(&key).copied()
    }

    #[must_use]
    pub fn esg(&self, category: EsgCategory) -> Option<f64> {
        self.get(ScoreKey::Esg(category))
    }

    #[must_use]
    pub fn sdg(&self, id: SdgId) -> Option<f64> {
        self.get(ScoreKey::Sdg(id))
    }

    /// Number of SDGs with a score.
    #[must_use]
    pub fn sdg_count(&self) -> usize {
        self.entries
            .keys()
            .filter(|k| matches!(k, ScoreKey::Sdg(_)))
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreKey, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, score) in &self.entries {
            map.serialize_entry(&key.to_string(), score)?;
        }
        map.end()
    }
}

/// One strategy in the extraction pipeline.
pub trait ScoreTier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this tier should run given what earlier tiers produced.
    fn should_run(&self, found: &ScoreMap) -> bool;

    /// Scores this tier can find in `text`, first match per key.
    fn extract(&self, text: &str) -> ScoreMap;
}

/// Parse a numeric score token such as `8`, `7.5`, `8/10` or `6.5/10)`.
///
/// Returns `None` for anything that is not a finite number.
pub fn parse_score_token(token: &str) -> Option<f64> {
    let token = token
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | ')' | ']' | '*'));
    let token = token.strip_suffix("/10").unwrap_or(token);
    let token = token.trim_start_matches(['(', '[', '*']);
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Exact structural markers: `SDG n: name (Score: x)` and `<Category> ... Performance ... Score: x`.
pub struct StrictTier;

/// `SDG <n>: <name> (Score: <number>`. The name may not contain parentheses or span lines.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static STRICT_SDG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SDG\s*(\d{1,2})\s*:\s*([^()\n]+?)\s*\(\s*Score:\s*(\d+(?:\.\d+)?)")
        .expect("valid regex")
});

/// Arbitrary text that may span lines but never enters a heading line.
/// A `#` inside a line is fine; a line whose first non-blank character is `#` is not.
const NO_HEADING_GAP: &str = r"[^\n]*?(?:\n[ \t\r]*(?:[^#\s][^\n]*?)?)*?";

/// Per-category ESG markers. Intervening text may not cross a heading line.
#[allow(clippy::expect_used)]
static STRICT_ESG_RES: LazyLock<Vec<(EsgCategory, Regex)>> = LazyLock::new(|| {
    EsgCategory::ALL
        .into_iter()
        .map(|category| {
            let pattern = format!(
                r"(?i)\b{keyword}{NO_HEADING_GAP}\bPerformance\b{NO_HEADING_GAP}Score:\s*(\d+(?:\.\d+)?)",
                keyword = category.keyword()
            );
            (category, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
});

impl ScoreTier for StrictTier {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn should_run(&self, _found: &ScoreMap) -> bool {
        true
    }

    fn extract(&self, text: &str) -> ScoreMap {
        let mut scores = ScoreMap::new();

        for caps in STRICT_SDG_RE.captures_iter(text) {
            let id = caps.get(1).and_then(|m| SdgId::parse_number(m.as_str()));
            let score = caps.get(3).and_then(|m| parse_score_token(m.as_str()));
            if let (Some(id), Some(score)) = (id, score) {
                scores.insert_if_absent(ScoreKey::Sdg(id), score);
            }
        }

        for (category, re) in STRICT_ESG_RES.iter() {
            if let Some(score) = re
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| parse_score_token(m.as_str()))
            {
                scores.insert_if_absent(ScoreKey::Esg(*category), score);
            }
        }

        scores
    }
}

/// Looser SDG formats, used when the strict tier found fewer than ten SDGs.
///
/// Every pattern captures the goal number plus two candidate groups; the
/// score is whichever candidate parses as a number, trying the second first.
pub struct LooseTier;

#[allow(clippy::expect_used)]
static LOOSE_SDG_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // SDG 7: Clean Energy - 8/10, SDG 7: Clean Energy - Score: 8
        r"(?i)SDG\s*(\d{1,2})\s*:\s*([^\n]+?)\s+[-–]\s+(?:Score:\s*)?([^\s,;]+)",
        // 7. Clean Energy - Score: 8
        r"(?im)^[ \t]*(\d{1,2})\.\s+([^\n]+?)\s+[-–]\s+Score:\s*([^\s,;]+)",
        // SDG 7 ... 8 out of 10
        r"(?i)SDG\s*(\d{1,2})\b([^\n]*?)(\d+(?:\.\d+)?)\s*out\s+of\s+10",
        // Goal 7: Clean Energy 8
        r"(?im)Goal\s*(\d{1,2})\s*:\s*([^\n]*)\s+(\S+)[ \t]*\r?$",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

impl LooseTier {
    fn disambiguate(caps: &Captures<'_>) -> f64 {
        caps.get(3)
            .and_then(|m| parse_score_token(m.as_str()))
            .or_else(|| caps.get(2).and_then(|m| parse_score_token(m.as_str())))
            .unwrap_or(AMBIGUOUS_SCORE)
    }
}

impl ScoreTier for LooseTier {
    fn name(&self) -> &'static str {
        "loose"
    }

    fn should_run(&self, found: &ScoreMap) -> bool {
        found.sdg_count() < LOOSE_TIER_THRESHOLD
    }

    fn extract(&self, text: &str) -> ScoreMap {
        let mut scores = ScoreMap::new();
        for re in LOOSE_SDG_RES.iter() {
            for caps in re.captures_iter(text) {
                let Some(id) = caps.get(1).and_then(|m| SdgId::parse_number(m.as_str())) else {
                    continue;
                };
                scores.insert_if_absent(ScoreKey::Sdg(id), Self::disambiguate(&caps));
            }
        }
        scores
    }
}

/// Any `SDG n` or `Goal n` mention followed on the same line by a number in range.
pub struct FallbackTier;

#[allow(clippy::expect_used)]
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:SDG|Goal)\s*#?\s*(\d{1,2})\b").expect("valid regex")
});

#[allow(clippy::expect_used)]
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

impl ScoreTier for FallbackTier {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn should_run(&self, found: &ScoreMap) -> bool {
        found.sdg_count() < FALLBACK_TIER_THRESHOLD
    }

    fn extract(&self, text: &str) -> ScoreMap {
        let mut scores = ScoreMap::new();
        let mentions: Vec<_> = MENTION_RE.captures_iter(text).collect();

        for (i, caps) in mentions.iter().enumerate() {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(id) = SdgId::parse_number(number.as_str()) else {
                continue;
            };

            // Search the rest of the line, stopping at the next mention.
            let rest = &text[whole.end()..];
            let mut end = rest.find('\n').unwrap_or(rest.len());
            if let Some(next) = mentions.get(i + 1).and_then(|c| c.get(0)) {
                end = end.min(next.start().saturating_sub(whole.end()));
            }

            let score = NUMBER_RE
                .find(&rest[..end])
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|v| (MIN_SCORE..=MAX_SCORE).contains(v));

            if let Some(score) = score {
                scores.insert_if_absent(ScoreKey::Sdg(id), score);
            }
        }

        scores
    }
}

/// Ordered pipeline of score tiers.
pub struct ScoreExtractor {
    tiers: Vec<Box<dyn ScoreTier>>,
}

impl Default for ScoreExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StrictTier),
            Box::new(LooseTier),
            Box::new(FallbackTier),
        ])
    }
}

impl ScoreExtractor {
    /// Build an extractor from tiers in precedence order.
    #[must_use]
    pub fn new(tiers: Vec<Box<dyn ScoreTier>>) -> Self {
        Self { tiers }
    }

    /// Run every applicable tier over `text` and merge the results.
    #[must_use]
    pub fn extract(&self, text: &str) -> ScoreMap {
        self.tiers.iter().fold(ScoreMap::new(), |mut found, tier| {
            if tier.should_run(&found) {
                let filled = found.fill_from(tier.extract(text));
                debug!(tier = tier.name(), filled, sdgs = found.sdg_count(), "score tier applied");
            }
            found
        })
    }
}

/// Extract scores with the default tiers.
///
/// Never fails: text without recognizable scores yields an empty map.
///
/// # Examples
/// ```
/// use compass_analysis::scores::{extract_scores, ScoreKey};
/// use compass_analysis::SdgId;
///
/// let scores = extract_scores("#### SDG 7: Affordable and Clean Energy (Score: 9/10)");
/// let sdg7 = SdgId::new(7).unwrap();
/// assert_eq!(scores.get(ScoreKey::Sdg(sdg7)), Some(9.0));
/// ```
#[must_use]
pub fn extract_scores(text: &str) -> ScoreMap {
    ScoreExtractor::default().extract(text)
}
