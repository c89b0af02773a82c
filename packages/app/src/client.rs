//! LLM client for the generative language API.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{AppError, Result};

/// User agent string identifying this client.
const USER_AGENT: &str = concat!("sustainability-compass/", env!("CARGO_PKG_VERSION"));

/// Request to the LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System instruction; omitted from the call when empty.
    pub system: String,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
}

/// Response from the LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Trait for LLM clients, enabling mocking in tests.
pub trait LlmClient: Send + Sync {
    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Model identifier recorded in analysis metadata.
    fn model(&self) -> &str;
}

/// Gemini `generateContent` client.
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    api_base_url: String,
    model: String,
    max_attempts: u32,
    retry_base_delay: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_attempts: config.max_retries.max(1),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url, self.model
        )
    }

    fn error_message(body: String) -> String {
        serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|r| r.error)
            .map(|e| e.message)
            .unwrap_or(body)
    }
}

impl LlmClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = self.endpoint();
        let body = GenerateRequest {
            system_instruction: (!request.system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: &request.system,
                }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        };

        let mut last_error: Option<AppError> = None;
        let mut next_delay = Duration::ZERO;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                debug!(attempt, delay_ms = next_delay.as_millis() as u64, "Retrying after delay");
                thread::sleep(next_delay);
            }

            next_delay = backoff_delay(self.retry_base_delay, attempt);

            let resp = match self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
            {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        "Connection error, will retry"
                    );
                    last_error = Some(AppError::LlmApiRequest(e));
                    continue;
                }
                Err(e) => return Err(AppError::LlmApiRequest(e)),
            };

            let status = resp.status().as_u16();

            if status == 429 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                warn!(attempt = attempt + 1, ?retry_after, "LLM rate limited");
                if let Some(secs) = retry_after {
                    next_delay = next_delay.max(Duration::from_secs(secs));
                }
                last_error = Some(AppError::LlmRateLimited {
                    retry_after_secs: next_delay.as_secs(),
                });
                continue;
            }

            if status >= 500 {
                let message = Self::error_message(resp.text().unwrap_or_default());
                warn!(attempt = attempt + 1, status, message = %message, "LLM server error");
                last_error = Some(AppError::LlmApiError { status, message });
                continue;
            }

            if status != 200 {
                let message = Self::error_message(resp.text().unwrap_or_default());
                return Err(AppError::LlmApiError { status, message });
            }

            let text = resp.text()?;
            let parsed: GenerateResponse = serde_json::from_str(&text)
                .map_err(|e| AppError::LlmResponseParse(e.to_string()))?;

            let content = parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| {
                    c.parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            if content.trim().is_empty() {
                warn!(attempt = attempt + 1, "LLM returned empty response");
                last_error = Some(AppError::LlmEmptyResponse);
                continue;
            }

            let usage = parsed.usage_metadata;
            return Ok(LlmResponse {
                content,
                input_tokens: usage.as_ref().map_or(0, |u| u.prompt_token_count),
                output_tokens: usage.as_ref().map_or(0, |u| u.candidates_token_count),
            });
        }

        Err(AppError::RetriesExhausted {
            attempts: self.max_attempts,
            source: Box::new(last_error.unwrap_or(AppError::LlmEmptyResponse)),
        })
    }
}

/// Delay before the retry following `attempt`: base, 2x base, 4x base, ...
/// Saturates instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.min(16))
}

/// Test utilities for the LLM client.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Mock LLM client for testing. Returns pre-configured responses in order
    /// and records every request it receives.
    pub struct MockLlmClient {
        responses: Mutex<Vec<Result<LlmResponse>>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<LlmResponse>>) -> Self {
            // Reverse so we can pop from the end
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(content: &str) -> Self {
            Self::with_responses(vec![content])
        }

        pub fn with_responses(contents: Vec<&str>) -> Self {
            Self::new(
                contents
                    .into_iter()
                    .map(|c| {
                        Ok(LlmResponse {
                            content: c.to_string(),
                            input_tokens: 100,
                            output_tokens: 200,
                        })
                    })
                    .collect(),
            )
        }

        /// Requests received so far, oldest first.
        pub fn requests(&self) -> Vec<LlmRequest> {
            self.requests
                .lock()
                .map(|r| r.clone())
                .unwrap_or_default()
        }
    }

    impl LlmClient for MockLlmClient {
        fn model(&self) -> &str {
            "mock-model"
        }

        fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            let mut responses = self
                .responses
                .lock()
                .map_err(|e| AppError::LlmResponseParse(format!("mock lock poisoned: {e}")))?;
            responses.pop().unwrap_or(Err(AppError::LlmEmptyResponse))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> LlmRequest {
        LlmRequest {
            system: "You are an analyst.".into(),
            prompt: "Analyze this report.".into(),
            max_output_tokens: 1024,
            temperature: 0.2,
        }
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 34}
        })
    }

    fn config(server: &MockServer) -> LlmConfig {
        LlmConfig::builder("test-key")
            .model("gemini-test")
            .api_base_url(server.uri())
            .max_retries(3)
            .retry_base_delay_ms(5)
            .build()
    }

    /// Run the blocking client off the async runtime.
    async fn complete(config: LlmConfig) -> Result<LlmResponse> {
        tokio::task::spawn_blocking(move || GeminiClient::new(&config)?.complete(&request()))
            .await
            .expect("blocking task panicked")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Analyze this report."}]}],
                "systemInstruction": {"parts": [{"text": "You are an analyst."}]},
                "generationConfig": {"maxOutputTokens": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("## Executive Summary")))
            .expect(1)
            .mount(&server)
            .await;

        let response = complete(config(&server)).await.unwrap();
        assert_eq!(response.content, "## Executive Summary");
        assert_eq!(response.input_tokens, 12);
        assert_eq!(response.output_tokens, 34);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retries_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
            .mount(&server)
            .await;

        let response = complete(config(&server)).await.unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retries_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("after quota")))
            .mount(&server)
            .await;

        let response = complete(config(&server)).await.unwrap();
        assert_eq!(response.content, "after quota");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = complete(config(&server)).await.unwrap_err();
        match err {
            AppError::LlmApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_responses_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
            .expect(3)
            .mount(&server)
            .await;

        let err = complete(config(&server)).await.unwrap_err();
        match err {
            AppError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, AppError::LlmEmptyResponse));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = complete(config(&server)).await.unwrap_err();
        assert!(matches!(err, AppError::LlmResponseParse(_)));
    }

    #[test]
    fn test_backoff_delay_doubles_and_saturates() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
        assert_eq!(
            backoff_delay(Duration::from_secs(u64::MAX / 4), 40),
            Duration::MAX
        );
    }

    #[test]
    fn test_mock_client_returns_in_order() {
        use test_support::MockLlmClient;

        let mock = MockLlmClient::with_responses(vec!["first", "second"]);
        assert_eq!(mock.complete(&request()).unwrap().content, "first");
        assert_eq!(mock.complete(&request()).unwrap().content, "second");
        assert!(matches!(
            mock.complete(&request()),
            Err(AppError::LlmEmptyResponse)
        ));
        assert_eq!(mock.requests().len(), 3);
    }
}
