//! Environment configuration
//!
//! External credentials and tuning constants in one place. The confidence
//! values are hand-tuned and deliberately kept as configurable fields
//! rather than re-derived.

use std::env;
use std::time::Duration;

/// Confidence assigned when the router falls back to modality-based routing.
pub const ROUTER_FALLBACK_CONFIDENCE: f32 = 0.5;

/// Confidence assigned when voice extraction falls back to the raw transcript.
pub const VOICE_FALLBACK_CONFIDENCE: f32 = 0.3;

/// Below this overall confidence the voice agent asks for a full review.
pub const CLARIFICATION_THRESHOLD: f32 = 0.7;

const DEFAULT_STT_URL: &str = "https://api.deepgram.com/v1/listen";

/// Retry behavior for upstream network calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
    /// Multiplier for each subsequent delay.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

/// Runtime configuration for the agents and their upstream clients.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub gemini_api_key: String,
    pub stt_api_key: String,
    pub stt_base_url: String,
    pub default_currency: String,
    pub router_fallback_confidence: f32,
    pub voice_fallback_confidence: f32,
    pub clarification_threshold: f32,
    pub retry: RetryConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            stt_api_key: String::new(),
            stt_base_url: DEFAULT_STT_URL.to_string(),
            default_currency: "INR".to_string(),
            router_fallback_confidence: ROUTER_FALLBACK_CONFIDENCE,
            voice_fallback_confidence: VOICE_FALLBACK_CONFIDENCE,
            clarification_threshold: CLARIFICATION_THRESHOLD,
            retry: RetryConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the environment (and a `.env` file when
    /// present). Missing credentials are not an error here; they surface as
    /// configuration errors at call time.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            config.gemini_api_key = key;
        }
        if let Ok(key) = env::var("STT_API_KEY") {
            config.stt_api_key = key;
        }
        if let Ok(url) = env::var("STT_BASE_URL") {
            config.stt_base_url = url;
        }
        if let Ok(currency) = env::var("DEFAULT_CURRENCY") {
            config.default_currency = currency;
        }
        config
    }
}
