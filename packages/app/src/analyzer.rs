use chrono::Utc;
use compass_analysis::{
    analyze_response, AnalysisMetadata, AnalysisResult, DocumentContent, Language,
};
use tracing::{debug, info, warn};

use crate::client::{LlmClient, LlmRequest};
use crate::config::LlmConfig;
use crate::error::Result;
use crate::prompt;

/// Runs a document through the model and normalizes the answer.
pub struct Analyzer<'a, C: LlmClient> {
    client: &'a C,
    config: &'a LlmConfig,
}

impl<'a, C: LlmClient> Analyzer<'a, C> {
    pub fn new(client: &'a C, config: &'a LlmConfig) -> Self {
        Self { client, config }
    }

    /// Analyze a whole document in one request.
    pub fn analyze_document(
        &self,
        document: &DocumentContent,
        output_language: Language,
    ) -> Result<AnalysisResult> {
        info!(
            pages = document.page_count,
            chars = document.text.chars().count(),
            language = %output_language,
            model = self.client.model(),
            "analyzing document"
        );

        let request = LlmRequest {
            system: prompt::build_system_prompt().to_string(),
            prompt: prompt::build_analysis_prompt(document, output_language),
            max_output_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
        };
        let response = self.client.complete(&request)?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "LLM response received"
        );

        let markdown = strip_markdown_fence(&response.content);
        let mut result = analyze_response(markdown);

        let coverage = result.coverage();
        if !coverage.is_empty() && coverage.esg_scored == 0 && coverage.sdgs_scored == 0 {
            warn!(
                has_summary = coverage.has_summary,
                recommendations = coverage.recommendations,
                "response carried no scores, all scores defaulted to 0"
            );
        }

        result.analysis_metadata = Some(AnalysisMetadata {
            analysis_date: Utc::now(),
            document_pages: document.page_count,
            content_length: document.text.chars().count(),
            tables_processed: document.tables.len(),
            language: document.language_detected,
            model_used: self.client.model().to_string(),
        });

        Ok(result)
    }
}

/// Unwrap a response that was returned inside a single ```markdown fence.
fn strip_markdown_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`markdown`, `md`) on the opening line
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim().contains(' ') => inner.trim(),
        _ => trimmed,
    }
}
