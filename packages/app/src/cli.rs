//! Command-line interface for Sustainability Compass.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use compass_analysis::{analyze_response, AnalysisResult, EsgCategory, Language, Trend};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::analyzer::Analyzer;
use crate::client::GeminiClient;
use crate::compare::{compare_company, generate_narrative, ComparisonReport};
use crate::config::{storage_dir_from_env, validate_company_name, validate_year, LlmConfig};
use crate::error::{AppError, Result};
use crate::pdf::extract_document;
use crate::store::ReportStore;

/// Width used when wrapping prose on the terminal.
const WRAP_WIDTH: usize = 88;

/// Sustainability Compass - ESG and SDG analysis of sustainability reports.
#[derive(Parser)]
#[command(name = "compass")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Report storage directory (default: $COMPASS_STORAGE_DIR or stored_reports/)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a PDF report with the model and store the result.
    Analyze {
        /// Path to the PDF report
        pdf: PathBuf,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Report year (YYYY)
        #[arg(short, long)]
        year: String,

        /// Language of the generated analysis (en or ar)
        #[arg(short, long, default_value = "en")]
        language: Language,

        /// Also write the analysis as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not store the result for later comparison
        #[arg(long)]
        no_store: bool,
    },

    /// Normalize a saved model response without calling the model.
    Parse {
        /// Markdown file containing the model response
        response: PathBuf,

        /// Company name; stores the result together with --year
        #[arg(short, long, requires = "year")]
        company: Option<String>,

        /// Report year (YYYY)
        #[arg(short, long, requires = "company")]
        year: Option<String>,

        /// Write the analysis as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare a company's stored reports across years.
    Compare {
        /// Company name
        company: String,

        /// Years to compare, comma separated (default: all stored years)
        #[arg(long, value_delimiter = ',')]
        years: Vec<String>,

        /// Ask the model for a narrative of the trends
        #[arg(long)]
        narrative: bool,

        /// Write the comparison as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List companies with stored reports.
    Companies,

    /// List a company's stored reports.
    Reports {
        /// Company name
        company: String,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = ReportStore::new(cli.storage.unwrap_or_else(storage_dir_from_env));

    match cli.command {
        Commands::Analyze {
            pdf,
            company,
            year,
            language,
            output,
            no_store,
        } => analyze_command(
            &store,
            &pdf,
            &company,
            &year,
            language,
            output.as_deref(),
            no_store,
        ),
        Commands::Parse {
            response,
            company,
            year,
            output,
        } => parse_command(
            &store,
            &response,
            company.as_deref().zip(year.as_deref()),
            output.as_deref(),
        ),
        Commands::Compare {
            company,
            years,
            narrative,
            output,
        } => compare_command(&store, &company, &years, narrative, output.as_deref()),
        Commands::Companies => companies_command(&store),
        Commands::Reports { company } => reports_command(&store, &company),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    println!("{} {}", style("Saved to:").green().bold(), path.display());
    Ok(())
}

fn source_metadata(path: &Path) -> serde_json::Value {
    serde_json::json!({
        "source_file": path.file_name().map(|n| n.to_string_lossy().into_owned()),
    })
}

/// Execute the analyze command.
fn analyze_command(
    store: &ReportStore,
    pdf: &Path,
    company: &str,
    year: &str,
    language: Language,
    output: Option<&Path>,
    no_store: bool,
) -> Result<()> {
    // Validate inputs before calling the model
    validate_company_name(company)?;
    let year = validate_year(year)?;
    let config = LlmConfig::from_env()?;
    let client = GeminiClient::new(&config)?;

    println!(
        "{} {} ({}) with {}",
        style("Analyzing").bold(),
        style(company).cyan(),
        style(year).green(),
        config.model
    );
    println!();

    let pb = spinner();
    pb.set_message("Extracting PDF text...");
    let document = match extract_document(pdf) {
        Ok(document) => document,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message(format!(
        "Waiting for analysis of {} pages...",
        document.page_count
    ));
    let result = match Analyzer::new(&client, &config).analyze_document(&document, language) {
        Ok(result) => result,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    print_analysis(&result);

    if !no_store {
        let path = store.store_report(company, year, &result, source_metadata(pdf))?;
        println!("{} {}", style("Stored:").green().bold(), path.display());
    }
    if let Some(output) = output {
        write_json(output, &result)?;
    }
    Ok(())
}

/// Execute the parse command.
fn parse_command(
    store: &ReportStore,
    response: &Path,
    store_as: Option<(&str, &str)>,
    output: Option<&Path>,
) -> Result<()> {
    let store_as = match store_as {
        Some((company, year)) => {
            validate_company_name(company)?;
            Some((company, validate_year(year)?))
        }
        None => None,
    };

    let text = fs::read_to_string(response)?;
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput(format!(
            "response file is empty: {}",
            response.display()
        )));
    }
    let result = analyze_response(&text);

    print_analysis(&result);

    if let Some((company, year)) = store_as {
        let path = store.store_report(company, year, &result, source_metadata(response))?;
        println!("{} {}", style("Stored:").green().bold(), path.display());
    }
    if let Some(output) = output {
        write_json(output, &result)?;
    }
    Ok(())
}

/// Execute the compare command.
fn compare_command(
    store: &ReportStore,
    company: &str,
    years: &[String],
    narrative: bool,
    output: Option<&Path>,
) -> Result<()> {
    let years = years
        .iter()
        .map(|y| validate_year(y))
        .collect::<Result<Vec<i32>>>()?;

    let compared = compare_company(store, company, &years)?;

    let narrative = if narrative {
        let config = LlmConfig::from_env()?;
        let client = GeminiClient::new(&config)?;
        let pb = spinner();
        pb.set_message("Generating narrative...");
        let text = generate_narrative(&client, &config, &compared);
        pb.finish_and_clear();
        if text.is_none() {
            println!(
                "{}",
                style("Narrative unavailable, showing scores only").yellow()
            );
        }
        text
    } else {
        None
    };

    let report = ComparisonReport::new(compared.comparison, narrative);
    print_comparison(&report);

    if let Some(output) = output {
        write_json(output, &report)?;
    }
    Ok(())
}

/// Execute the companies command.
fn companies_command(store: &ReportStore) -> Result<()> {
    let companies = store.companies()?;
    if companies.is_empty() {
        println!(
            "No stored reports in {}",
            style(store.root().display()).dim()
        );
        return Ok(());
    }
    for company in companies {
        println!("{company}");
    }
    Ok(())
}

/// Execute the reports command.
fn reports_command(store: &ReportStore, company: &str) -> Result<()> {
    let reports = store.company_reports(company)?;
    if reports.is_empty() {
        println!("No stored reports for {}", style(company).cyan());
        return Ok(());
    }

    println!("{}", style(company).cyan().bold());
    for (year, report) in &reports {
        let esg = &report.analysis_results.esg_analysis;
        println!(
            "  {}  E&F {:>4.1}  Env {:>4.1}  Soc {:>4.1}  SDGs {:>2}  stored {}",
            style(year).green(),
            esg.get(EsgCategory::EconomicFinancial).score,
            esg.get(EsgCategory::Environmental).score,
            esg.get(EsgCategory::Social).score,
            report.analysis_results.sdg_mapping.active_count(),
            report.analysis_date.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

fn print_analysis(result: &AnalysisResult) {
    if !result.executive_summary.is_empty() {
        println!("{}", style("Executive summary").bold());
        println!(
            "{}",
            textwrap::indent(&textwrap::fill(&result.executive_summary, WRAP_WIDTH), "  ")
        );
        println!();
    }

    println!("{}", style("ESG scores").bold());
    for (category, entry) in result.esg_analysis.iter() {
        println!("  {:<34} {:>4.1}/10", category.title(), entry.score);
    }
    println!();

    let active: Vec<_> = result
        .sdg_mapping
        .iter()
        .filter(|(_, sdg)| sdg.score > 0.0)
        .collect();
    println!("{} ({} active)", style("SDG scores").bold(), active.len());
    for (id, sdg) in active {
        println!(
            "  SDG {:<3} {:<42} {:>4.1}/10  {}",
            id.number(),
            sdg.name,
            sdg.score,
            style(sdg.impact_level.as_str()).dim()
        );
    }

    if !result.recommendations.is_empty() {
        println!();
        println!("{}", style("Recommendations").bold());
        for (i, recommendation) in result.recommendations.iter().enumerate() {
            let wrapped = textwrap::fill(recommendation, WRAP_WIDTH - 5);
            println!("  {}. {}", i + 1, textwrap::indent(&wrapped, "     ").trim_start());
        }
    }

    let coverage = result.coverage();
    if coverage.is_empty() {
        println!();
        println!(
            "{}",
            style("Warning: no scores or sections were found in the response").yellow()
        );
    }
    println!();
}

fn trend_label(trend: Trend, change: f64) -> String {
    let text = format!("{change:+.1} {}", trend.as_str());
    match trend {
        Trend::Improving => style(text).green().to_string(),
        Trend::Declining => style(text).red().to_string(),
    }
}

fn print_comparison(report: &ComparisonReport) {
    let comparison = &report.comparison;
    let summary = &comparison.summary;

    println!(
        "{} {} ({})",
        style("Comparison for").bold(),
        style(&comparison.company_name).cyan(),
        summary.year_range
    );
    println!();

    println!("{}", style("ESG trends").bold());
    for (category, entry) in &comparison.esg_trends {
        println!(
            "  {:<34} {}",
            category.title(),
            trend_label(entry.trend, entry.change)
        );
    }
    println!();

    println!("{}", style("SDG trends").bold());
    if comparison.sdg_trends.is_empty() {
        println!("  No SDG scored in the compared years");
    }
    for (id, entry) in &comparison.sdg_trends {
        println!(
            "  SDG {:<3} {:<42} {}",
            id.number(),
            id.canonical_name(),
            trend_label(entry.trend, entry.change)
        );
    }
    println!();

    println!(
        "ESG: {} improving, {} declining. SDGs: {} improving, {} declining of {} active.",
        summary.esg_summary.improving_categories,
        summary.esg_summary.declining_categories,
        summary.sdg_summary.improving_sdgs,
        summary.sdg_summary.declining_sdgs,
        summary.sdg_summary.total_active_sdgs
    );

    if let Some(narrative) = &report.narrative {
        println!();
        println!("{}", style("Narrative").bold());
        println!("{narrative}");
    }
    println!();
}
