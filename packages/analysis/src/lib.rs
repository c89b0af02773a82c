//! Sustainability Compass analysis core.
//!
//! Turns free-form model responses about a company's sustainability report
//! into complete, scored [`AnalysisResult`]s and compares results across
//! years.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use compass_analysis::{analyze_response, ComparisonResult, EsgCategory, SdgId};
//!
//! let older = analyze_response("### 🌱 Environmental Performance (Score: 6/10)");
//! let newer = analyze_response(
//!     "### 🌱 Environmental Performance (Score: 7.5/10)\n\
//!      #### SDG 13: Climate Action (Score: 8/10)",
//! );
//! assert_eq!(newer.sdg_mapping.get(SdgId::new(13).unwrap()).score, 8.0);
//!
//! let results = BTreeMap::from([(2022, older), (2023, newer)]);
//! let comparison = ComparisonResult::build("Acme", &results).unwrap();
//! assert_eq!(comparison.esg_trends[&EsgCategory::Environmental].change, 1.5);
//! assert_eq!(comparison.summary.sdg_summary.total_active_sdgs, 1);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: SDG titles, score bounds and extraction thresholds
//! - [`types`]: Analysis data model
//! - [`error`]: Error types and Result alias
//! - [`markdown`]: Heading, label and list helpers
//! - [`scores`]: Tiered score extraction
//! - [`sections`]: Qualitative field extraction
//! - [`normalize`]: Complete-with-defaults result construction
//! - [`trend`]: Year-over-year trend computation
//! - [`summary`]: Comparison counters

pub mod config;
pub mod error;
pub mod markdown;
pub mod normalize;
pub mod scores;
pub mod sections;
pub mod summary;
pub mod trend;
pub mod types;

pub use error::{AnalysisError, Result};
pub use normalize::{analyze_response, normalize};
pub use scores::{extract_scores, ScoreExtractor, ScoreKey, ScoreMap};
pub use sections::{extract_sections, Sections};
pub use summary::{summarize, ComparisonResult, ComparisonSummary};
pub use trend::{compute_trends, TrendEntry, Trends};
pub use types::{
    AnalysisMetadata, AnalysisResult, Coverage, DocumentContent, EsgAnalysis, EsgCategory,
    EsgCategoryResult, ImpactLevel, Language, SdgId, SdgMapping, SdgResult, TableRecord, Trend,
};
