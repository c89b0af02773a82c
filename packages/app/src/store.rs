//! JSON file store for analyzed reports.
//!
//! Layout: `<root>/<sanitized company>/report_<year>.json`, one file per
//! company and year.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compass_analysis::AnalysisResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::validate_company_name;
use crate::error::{AppError, Result};

const REPORT_PREFIX: &str = "report_";
const REPORT_SUFFIX: &str = ".json";

/// A stored analysis of one company's report for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    /// Company name as given by the user, before sanitizing.
    pub company_name: String,
    pub year: i32,
    /// When the report was stored.
    pub analysis_date: DateTime<Utc>,
    pub analysis_results: AnalysisResult,
    /// Free-form context such as the source file name.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Directory-backed report store.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
}

fn report_file_name(year: i32) -> String {
    format!("{REPORT_PREFIX}{year}{REPORT_SUFFIX}")
}

/// Year encoded in a `report_<year>.json` file name.
fn year_from_file_name(name: &str) -> Option<i32> {
    name.strip_prefix(REPORT_PREFIX)?
        .strip_suffix(REPORT_SUFFIX)?
        .parse()
        .ok()
}

fn has_report_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(year_from_file_name)
                    .is_some()
            })
        })
        .unwrap_or(false)
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn company_dir(&self, company: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_company_name(company)?))
    }

    /// Write a report, replacing any earlier one for the same company and year.
    ///
    /// # Returns
    /// Path to the saved file
    pub fn store_report(
        &self,
        company: &str,
        year: i32,
        results: &AnalysisResult,
        metadata: serde_json::Value,
    ) -> Result<PathBuf> {
        let company_dir = self.company_dir(company)?;
        fs::create_dir_all(&company_dir)?;

        let report = StoredReport {
            company_name: company.trim().to_string(),
            year,
            analysis_date: Utc::now(),
            analysis_results: results.clone(),
            metadata,
        };
        let content = serde_json::to_string_pretty(&report)?;

        let output_file = company_dir.join(report_file_name(year));
        let temp_file = company_dir.join(format!(".{}.tmp", report_file_name(year)));

        // Write to temp file first, then sync and rename for atomicity
        {
            let mut file = File::create(&temp_file)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        // On Windows, rename fails if the destination already exists
        #[cfg(target_os = "windows")]
        if output_file.exists() {
            fs::remove_file(&output_file)?;
        }

        fs::rename(&temp_file, &output_file)?;

        info!(company, year, path = %output_file.display(), "Stored report");
        Ok(output_file)
    }

    /// Load the report for one company and year.
    pub fn load_report(&self, company: &str, year: i32) -> Result<StoredReport> {
        let path = self.company_dir(company)?.join(report_file_name(year));
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::ReportNotFound {
                    company: company.to_string(),
                    year,
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// All stored reports of a company, keyed by year.
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn company_reports(&self, company: &str) -> Result<BTreeMap<i32, StoredReport>> {
        let company_dir = self.company_dir(company)?;
        let mut reports = BTreeMap::new();
        if !company_dir.is_dir() {
            return Ok(reports);
        }

        for entry in fs::read_dir(&company_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(year) = file_name.to_str().and_then(year_from_file_name) else {
                continue;
            };

            let parsed = fs::read_to_string(entry.path())
                .map_err(AppError::from)
                .and_then(|content| {
                    serde_json::from_str::<StoredReport>(&content).map_err(AppError::from)
                });
            match parsed {
                Ok(report) => {
                    reports.insert(year, report);
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping invalid report file");
                }
            }
        }

        debug!(company, count = reports.len(), "Loaded company reports");
        Ok(reports)
    }

    /// Sanitized names of all companies with at least one stored report, sorted.
    pub fn companies(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut companies = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || !has_report_files(&path) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                companies.push(name.to_string());
            }
        }
        companies.sort();
        Ok(companies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_analysis::EsgCategory;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn result_with_env_score(score: f64) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        result.esg_analysis.get_mut(EsgCategory::Environmental).score = score;
        result.executive_summary = "Summary".to_string();
        result
    }

    #[test]
    fn test_store_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let results = result_with_env_score(7.5);

        let path = store
            .store_report(
                "Acme Corp.",
                2023,
                &results,
                serde_json::json!({"source": "acme_2023.pdf"}),
            )
            .unwrap();
        assert_eq!(path, dir.path().join("Acme_Corp").join("report_2023.json"));
        assert!(!dir.path().join("Acme_Corp").join(".report_2023.json.tmp").exists());

        let loaded = store.load_report("Acme Corp.", 2023).unwrap();
        assert_eq!(loaded.company_name, "Acme Corp.");
        assert_eq!(loaded.year, 2023);
        assert_eq!(loaded.analysis_results, results);
        assert_eq!(loaded.metadata["source"], "acme_2023.pdf");
    }

    #[test]
    fn test_store_overwrites_same_year() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        store
            .store_report("Acme", 2023, &result_with_env_score(5.0), serde_json::Value::Null)
            .unwrap();
        store
            .store_report("Acme", 2023, &result_with_env_score(6.0), serde_json::Value::Null)
            .unwrap();

        let reports = store.company_reports("Acme").unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[&2023]
                .analysis_results
                .esg_analysis
                .get(EsgCategory::Environmental)
                .score,
            6.0
        );
    }

    #[test]
    fn test_load_missing_report() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let err = store.load_report("Acme", 2020).unwrap_err();
        assert!(matches!(err, AppError::ReportNotFound { year: 2020, .. }));
    }

    #[test]
    fn test_company_reports_skips_invalid_files() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        store
            .store_report("Acme", 2022, &result_with_env_score(6.0), serde_json::Value::Null)
            .unwrap();
        store
            .store_report("Acme", 2023, &result_with_env_score(7.0), serde_json::Value::Null)
            .unwrap();
        let company_dir = dir.path().join("Acme");
        fs::write(company_dir.join("report_2021.json"), "{ not json").unwrap();
        fs::write(company_dir.join("report_latest.json"), "{}").unwrap();
        fs::write(company_dir.join("notes.txt"), "hello").unwrap();

        let reports = store.company_reports("Acme").unwrap();
        assert_eq!(reports.keys().copied().collect::<Vec<_>>(), vec![2022, 2023]);
    }

    #[test]
    fn test_company_reports_unknown_company_is_empty() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        assert!(store.company_reports("Nobody").unwrap().is_empty());
    }

    #[test]
    fn test_companies_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        store
            .store_report("Zeta Energy", 2023, &AnalysisResult::default(), serde_json::Value::Null)
            .unwrap();
        store
            .store_report("Alpha", 2022, &AnalysisResult::default(), serde_json::Value::Null)
            .unwrap();
        fs::create_dir_all(dir.path().join("Empty")).unwrap();
        fs::write(dir.path().join("stray.json"), "{}").unwrap();

        assert_eq!(store.companies().unwrap(), vec!["Alpha", "Zeta_Energy"]);
    }

    #[test]
    fn test_companies_missing_root() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("does-not-exist"));
        assert!(store.companies().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_company_name_rejected() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let err = store
            .store_report("???", 2023, &AnalysisResult::default(), serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCompanyName(_)));
    }

    #[test]
    fn test_year_from_file_name() {
        assert_eq!(year_from_file_name("report_2023.json"), Some(2023));
        assert_eq!(year_from_file_name("report_2023.json.tmp"), None);
        assert_eq!(year_from_file_name(".report_2023.json.tmp"), None);
        assert_eq!(year_from_file_name("summary.json"), None);
    }
}
