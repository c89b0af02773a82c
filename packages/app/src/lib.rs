//! Sustainability Compass - Analyze sustainability reports with an LLM and
//! compare them across years.
//!
//! This crate wraps the pure analysis core in [`compass_analysis`] with the
//! I/O it needs: PDF ingestion, prompt construction, the model client, a JSON
//! report store and the command-line interface.
//!
//! # Example
//!
//! ```
//! use compass_app::config;
//!
//! // Validate report inputs before touching the model or the store
//! assert_eq!(config::validate_year("2023").unwrap(), 2023);
//! assert_eq!(config::validate_company_name("Acme Corp.").unwrap(), "Acme_Corp");
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Runtime configuration and input validation
//! - [`error`]: Error types and Result alias
//! - [`pdf`]: PDF text extraction and language detection
//! - [`prompt`]: Analysis and comparison prompts
//! - [`client`]: Model client with retry
//! - [`analyzer`]: Document analysis orchestration
//! - [`store`]: Per-company, per-year JSON report store
//! - [`compare`]: Comparison of stored reports
//! - [`cli`]: Command-line interface

pub mod analyzer;
pub mod cli;
pub mod client;
pub mod compare;
pub mod config;
pub mod error;
pub mod pdf;
pub mod prompt;
pub mod store;

pub use analyzer::Analyzer;
pub use client::{GeminiClient, LlmClient, LlmRequest, LlmResponse};
#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockLlmClient;
pub use compare::{compare_company, generate_narrative, CompanyComparison, ComparisonReport};
pub use config::{validate_company_name, validate_year, LlmConfig};
pub use error::{AppError, Result};
pub use store::{ReportStore, StoredReport};
