//! Speech transcription adapter
//!
//! Wraps an external speech-to-text provider behind a uniform transcript
//! contract. Punctuation normalization is always requested, diarization is
//! always off, and up to two ranked alternates are surfaced.

use crate::error::AgentError;
use crate::models::TranscriptionResult;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// How many ranked alternates to surface beyond the primary transcript.
const MAX_ALTERNATIVES: usize = 2;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe the referenced audio, optionally hinting the language.
    async fn transcribe(
        &self,
        audio_url: &str,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult>;
}

/// HTTP adapter for a Deepgram-style prerecorded transcription endpoint.
pub struct HttpSttClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HttpSttClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl SpeechToText for HttpSttClient {
    async fn transcribe(
        &self,
        audio_url: &str,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult> {
        if self.api_key.is_empty() {
            return Err(AgentError::Configuration(
                "STT_API_KEY not configured".to_string(),
            ));
        }

        let mut query: Vec<(&str, String)> = vec![
            ("punctuate", "true".to_string()),
            ("diarize", "false".to_string()),
            ("alternatives", "3".to_string()),
        ];
        if let Some(lang) = language_hint {
            query.push(("language", lang.to_string()));
        }

        let response = self
            .client
            .post(&self.base_url)
            .query(&query)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&json!({ "url": audio_url }))
            .send()
            .await
            .map_err(|e| {
                AgentError::Transcription(format!("Transcription request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Transcription(format!(
                "Transcription API returned {}: {}",
                status, body
            )));
        }

        let parsed: SttResponse = response.json().await.map_err(|e| {
            AgentError::Transcription(format!("Malformed transcription response: {}", e))
        })?;

        let channel = parsed
            .results
            .channels
            .into_iter()
            .next()
            .ok_or_else(|| {
                AgentError::Transcription("No transcript channel in response".to_string())
            })?;

        let detected_language = channel.detected_language;
        let mut ranked = channel.alternatives.into_iter();

        let primary = ranked
            .next()
            .filter(|alt| !alt.transcript.is_empty())
            .ok_or_else(|| {
                AgentError::Transcription("No usable transcript in response".to_string())
            })?;

        let alternatives: Vec<String> = ranked
            .map(|alt| alt.transcript)
            .filter(|t| !t.is_empty())
            .take(MAX_ALTERNATIVES)
            .collect();

        info!(
            confidence = primary.confidence,
            alternates = alternatives.len(),
            "Transcription received"
        );

        Ok(TranscriptionResult {
            text: primary.transcript,
            confidence: primary.confidence,
            language: detected_language
                .or_else(|| language_hint.map(str::to_string))
                .unwrap_or_else(|| "en".to_string()),
            alternatives,
        })
    }
}

/// Mock transcriber for development & testing.
/// Keeps the voice pipeline functional without a provider account.
pub struct MockStt {
    pub text: String,
    pub confidence: f32,
}

#[async_trait]
impl SpeechToText for MockStt {
    async fn transcribe(
        &self,
        _audio_url: &str,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult> {
        Ok(TranscriptionResult {
            text: self.text.clone(),
            confidence: self.confidence,
            language: language_hint.unwrap_or("en").to_string(),
            alternatives: vec![],
        })
    }
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    results: SttResults,
}

#[derive(Debug, Deserialize)]
struct SttResults {
    #[serde(default)]
    channels: Vec<SttChannel>,
}

#[derive(Debug, Deserialize)]
struct SttChannel {
    #[serde(default)]
    alternatives: Vec<SttAlternative>,
    detected_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SttAlternative {
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_response_parses() {
        let parsed: SttResponse = serde_json::from_str(
            r#"{
                "results": {
                    "channels": [{
                        "detected_language": "en",
                        "alternatives": [
                            {"transcript": "I spent fifty rupees on chai", "confidence": 0.92},
                            {"transcript": "I spent fifteen rupees on chai", "confidence": 0.41},
                            {"transcript": "I spend fifty rupees on chai", "confidence": 0.33},
                            {"transcript": "ignored fourth", "confidence": 0.1}
                        ]
                    }]
                }
            }"#,
        )
        .unwrap();

        let channel = &parsed.results.channels[0];
        assert_eq!(channel.alternatives.len(), 4);
        assert_eq!(channel.detected_language.as_deref(), Some("en"));
        assert!((channel.alternatives[0].confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn test_empty_channels_parse() {
        let parsed: SttResponse = serde_json::from_str(r#"{"results": {"channels": []}}"#).unwrap();
        assert!(parsed.results.channels.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let client = HttpSttClient::new(String::new(), "https://stt.invalid/v1".to_string());
        let result = client.transcribe("https://cdn.example/a.ogg", None).await;
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_mock_uses_language_hint() {
        let stt = MockStt {
            text: "paid two hundred".to_string(),
            confidence: 0.8,
        };
        let result = stt
            .transcribe("https://cdn.example/a.ogg", Some("hi"))
            .await
            .unwrap();
        assert_eq!(result.language, "hi");
        assert_eq!(result.text, "paid two hundred");
    }
}
