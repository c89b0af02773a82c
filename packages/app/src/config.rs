//! Runtime configuration and input validation.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, Result};

/// Default model used for analyses.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the generative language API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default directory for stored reports.
pub const DEFAULT_STORAGE_DIR: &str = "stored_reports";

/// Earliest report year accepted.
pub const MIN_REPORT_YEAR: i32 = 1900;

/// Year pattern: exactly four digits.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

/// Characters dropped from company names before they become directory names.
#[allow(clippy::expect_used)]
static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

/// Configuration for the LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl LlmConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Config("LLM_API_KEY not set".into()))?;

        Ok(Self {
            api_key,
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.into()),
            temperature: env_parse("LLM_TEMPERATURE", 0.2),
            max_output_tokens: env_parse("LLM_MAX_OUTPUT_TOKENS", 8192),
            timeout_secs: env_parse("LLM_TIMEOUT_SECS", 300),
            max_retries: env_parse("LLM_MAX_RETRIES", 3),
            retry_base_delay_ms: env_parse("LLM_RETRY_BASE_DELAY_MS", 3000),
        })
    }

    /// Create a config builder for testing.
    pub fn builder(api_key: impl Into<String>) -> LlmConfigBuilder {
        LlmConfigBuilder {
            config: LlmConfig {
                api_key: api_key.into(),
                model: DEFAULT_MODEL.into(),
                api_base_url: DEFAULT_API_BASE_URL.into(),
                temperature: 0.2,
                max_output_tokens: 8192,
                timeout_secs: 300,
                max_retries: 3,
                retry_base_delay_ms: 3000,
            },
        }
    }
}

/// Builder for constructing `LlmConfig` in tests.
pub struct LlmConfigBuilder {
    config: LlmConfig,
}

impl LlmConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.config.api_base_url = api_base_url.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.config.max_output_tokens = max_output_tokens;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn retry_base_delay_ms(mut self, retry_base_delay_ms: u64) -> Self {
        self.config.retry_base_delay_ms = retry_base_delay_ms;
        self
    }

    pub fn build(self) -> LlmConfig {
        self.config
    }
}

/// Report storage directory from `COMPASS_STORAGE_DIR`, or the default.
pub fn storage_dir_from_env() -> PathBuf {
    std::env::var("COMPASS_STORAGE_DIR")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from)
}

/// Validate a report year.
///
/// # Returns
/// * `Ok(year)` for four digits between 1900 and next calendar year
/// * `Err(AppError::InvalidYear)` otherwise
///
/// # Examples
/// ```
/// use compass_app::config::validate_year;
///
/// assert_eq!(validate_year("2023").unwrap(), 2023);
/// assert!(validate_year("23").is_err());
/// assert!(validate_year("1850").is_err());
/// ```
pub fn validate_year(year: &str) -> Result<i32> {
    let trimmed = year.trim();
    if !YEAR_PATTERN.is_match(trimmed) {
        return Err(AppError::InvalidYear(year.to_string()));
    }
    let parsed: i32 = trimmed
        .parse()
        .map_err(|_| AppError::InvalidYear(year.to_string()))?;

    let latest = chrono::Utc::now().year() + 1;
    if !(MIN_REPORT_YEAR..=latest).contains(&parsed) {
        return Err(AppError::InvalidYear(year.to_string()));
    }
    Ok(parsed)
}

/// Turn a company name into a directory-safe key.
///
/// Applies NFKC normalization, drops everything except word characters,
/// whitespace and `-`, trims, and replaces spaces with `_`.
///
/// # Examples
/// ```
/// use compass_app::config::sanitize_company_name;
///
/// assert_eq!(sanitize_company_name("Acme Corp. (UAE)"), "Acme_Corp_UAE");
/// assert_eq!(sanitize_company_name("  Green-Energy Ltd "), "Green-Energy_Ltd");
/// ```
pub fn sanitize_company_name(name: &str) -> String {
    let normalized: String = name.nfkc().collect();
    UNSAFE_NAME_CHARS
        .replace_all(&normalized, "")
        .trim()
        .replace(' ', "_")
}

/// Validate a company name, returning its sanitized form.
pub fn validate_company_name(name: &str) -> Result<String> {
    let sanitized = sanitize_company_name(name);
    if sanitized.chars().any(char::is_alphanumeric) {
        Ok(sanitized)
    } else {
        Err(AppError::InvalidCompanyName(name.to_string()))
    }
}
