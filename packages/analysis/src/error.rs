//! Error types for the analysis core.
//!
//! Extraction never fails: a missing pattern or label degrades to a default
//! value. Only caller mistakes are reported through `AnalysisError`.

use thiserror::Error;

/// Main error type for the analysis library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Trend computation needs at least two years to diff.
    #[error("Insufficient data for comparison: need at least 2 years, got {years}")]
    InsufficientData { years: usize },

    /// SDG number outside 1..=17.
    #[error("Unknown SDG number: {0}. Expected 1 to 17")]
    UnknownSdg(u8),
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
