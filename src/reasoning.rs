//! External reasoning client
//!
//! Text-in/text-out boundary over the Gemini generateContent API with token
//! usage accounting. Transient failures are retried with exponential
//! backoff; the client knows nothing about any agent's output shape.

use crate::config::RetryConfig;
use crate::error::AgentError;
use crate::models::{ReasoningResult, TokenUsage};
use crate::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Trait boundary for reasoning so agents stay testable without a network.
#[async_trait::async_trait]
pub trait Reasoner: Send + Sync {
    /// Send a system instruction and user prompt, returning generated text
    /// plus token usage.
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<ReasoningResult>;
}

/// Reusable reasoning client (connection-pooled)
pub struct ReasoningClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl ReasoningClient {
    pub fn new(api_key: String, retry: RetryConfig) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait::async_trait]
impl Reasoner for ReasoningClient {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<ReasoningResult> {
        if self.api_key.is_empty() {
            return Err(AgentError::Configuration(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
        };

        let mut delay = self.retry.initial_delay;
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            match self.client.post(&url).json(&request).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        if attempt > 1 {
                            info!(attempt, "Reasoning call succeeded after retry");
                        }
                        let parsed: GeminiResponse = response.json().await.map_err(|e| {
                            AgentError::Upstream(format!("Malformed reasoning response: {}", e))
                        })?;
                        return extract_result(parsed);
                    }

                    let body = response.text().await.unwrap_or_default();

                    if !is_retryable_status(status) {
                        // Client errors (400, 401, 403, ...) fail immediately.
                        return Err(AgentError::Upstream(format!(
                            "Reasoning API returned {}: {}",
                            status, body
                        )));
                    }

                    warn!(
                        %status,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        "Transient reasoning API error"
                    );
                    last_error = format!("{}: {}", status, body);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        "Reasoning API network error"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * self.retry.backoff_factor)
                        .min(self.retry.max_delay.as_secs_f64()),
                );
            }
        }

        Err(AgentError::TransientUpstream(format!(
            "Reasoning call failed after {} attempts: {}",
            self.retry.max_attempts, last_error
        )))
    }
}

/// Canned reasoner for development & testing.
/// Keeps agents functional without an API key.
pub struct MockReasoner {
    text: Option<String>,
}

impl MockReasoner {
    /// Always returns the given text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Always fails as if the retry budget were exhausted.
    pub fn exhausted() -> Self {
        Self { text: None }
    }
}

#[async_trait::async_trait]
impl Reasoner for MockReasoner {
    async fn generate(&self, _system_instruction: &str, _prompt: &str) -> Result<ReasoningResult> {
        match &self.text {
            Some(text) => Ok(ReasoningResult {
                text: text.clone(),
                usage: TokenUsage {
                    input_tokens: 42,
                    output_tokens: 17,
                },
            }),
            None => Err(AgentError::TransientUpstream(
                "Reasoning call failed after 3 attempts: mock outage".to_string(),
            )),
        }
    }
}

/// 408/429/5xx are worth retrying; everything else is terminal.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::INTERNAL_SERVER_ERROR
        || status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
}

fn extract_result(response: GeminiResponse) -> Result<ReasoningResult> {
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.clone())
        .ok_or_else(|| AgentError::Upstream("Empty response from reasoning API".to_string()))?;

    let usage = response
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count.max(0) as u32,
            output_tokens: u.candidates_token_count.max(0) as u32,
        })
        .unwrap_or_default();

    Ok(ReasoningResult { text, usage })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i32,
    #[serde(default)]
    candidates_token_count: i32,
}
