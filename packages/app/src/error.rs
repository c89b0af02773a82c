//! Error types for the Sustainability Compass application.

use std::path::PathBuf;

use compass_analysis::AnalysisError;
use thiserror::Error;

/// Main error type for the application library.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("Invalid year: '{0}'. Expected a four-digit year between 1900 and next year")]
    InvalidYear(String),

    #[error("Invalid company name: '{0}'. It must contain at least one letter or digit")]
    InvalidCompanyName(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("LLM API request failed: {0}")]
    LlmApiRequest(#[from] reqwest::Error),

    #[error("LLM API error (status {status}): {message}")]
    LlmApiError { status: u16, message: String },

    #[error("LLM rate limited, retry after {retry_after_secs}s")]
    LlmRateLimited { retry_after_secs: u64 },

    #[error("failed to parse LLM response: {0}")]
    LlmResponseParse(String),

    #[error("LLM returned empty response")]
    LlmEmptyResponse,

    #[error("LLM request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error("no stored report for {company} ({year})")]
    ReportNotFound { company: String, year: i32 },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
