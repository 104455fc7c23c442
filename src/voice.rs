//! Voice agent
//!
//! Transcribes audio, then extracts expense fields from the transcript over
//! the shared agent lifecycle. Low-confidence results carry a clarification
//! list instead of guessed values.

use crate::agent::{AgentRuntime, AgentSpec};
use crate::config::AgentConfig;
use crate::events::AgentEvent;
use crate::extractor;
use crate::models::{
    ExecutionContext, ExtractedExpense, TranscriptionResult, VoiceExpenseResult,
};
use crate::parsing;
use crate::stt::SpeechToText;
use crate::tools::{voice_registry, ToolRegistry};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{info, warn};

/// Clarification markers for the caller's follow-up UI.
pub const CLARIFY_AMOUNT: &str = "amount";
pub const CLARIFY_REVIEW_ALL: &str = "review_all_fields";

const SYSTEM_INSTRUCTION: &str = r#"You extract expense fields from one spoken sentence.

The transcript may contain spoken numbers ("fifty", "two hundred") and
relative dates ("yesterday", "three days ago"). An amount you cannot find
must be null, never 0. A date you cannot resolve must be null, never today.
Dates use ISO format (YYYY-MM-DD).

Return ONLY a JSON object, no explanation text:

{
  "amount": null,
  "currency": "INR",
  "description": "...",
  "merchant": null,
  "category": null,
  "date": null,
  "confidence": 0.0
}"#;

/// Draft shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct ExpenseDraft {
    amount: Option<f64>,
    currency: Option<String>,
    description: Option<String>,
    merchant: Option<String>,
    category: Option<String>,
    date: Option<NaiveDate>,
    confidence: f32,
}

pub struct VoiceAgent {
    tools: ToolRegistry,
    default_currency: String,
    fallback_confidence: f32,
    clarification_threshold: f32,
}

impl VoiceAgent {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            tools: voice_registry(),
            default_currency: config.default_currency.clone(),
            fallback_confidence: config.voice_fallback_confidence,
            clarification_threshold: config.clarification_threshold,
        }
    }

    /// Transcribe and extract in one tracked invocation. A transcription
    /// failure still yields exactly one (failed) execution log entry before
    /// it propagates.
    pub async fn process(
        &self,
        runtime: &AgentRuntime,
        stt: &dyn SpeechToText,
        ctx: &ExecutionContext,
        audio_url: &str,
        language_hint: Option<&str>,
    ) -> crate::Result<VoiceExpenseResult> {
        let start = Instant::now();

        let transcript = match stt.transcribe(audio_url, language_hint).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!(error = %e, audio_url, "Transcription failed");
                runtime
                    .record_failure(
                        self.name(),
                        ctx,
                        json!({ "audio_url": audio_url, "language_hint": language_hint }),
                        &e,
                        start,
                    )
                    .await;
                return Err(e);
            }
        };

        info!(
            confidence = transcript.confidence,
            language = %transcript.language,
            "Transcription complete"
        );

        runtime.run(self, ctx, transcript).await
    }
}

#[async_trait::async_trait]
impl AgentSpec for VoiceAgent {
    type Input = TranscriptionResult;
    type Output = VoiceExpenseResult;

    fn name(&self) -> &'static str {
        "voice_expense"
    }

    fn system_instruction(&self) -> &str {
        SYSTEM_INSTRUCTION
    }

    fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    async fn precompute_hints(&self, input: &TranscriptionResult) -> Value {
        let mut hints = json!({});

        match self
            .tools
            .invoke("parse_spoken_amount", json!({ "text": input.text }))
            .await
        {
            Ok(output) => hints["amount"] = output.data["amount"].clone(),
            Err(e) => warn!(error = %e, "parse_spoken_amount tool failed"),
        }

        match self
            .tools
            .invoke("resolve_date_reference", json!({ "text": input.text }))
            .await
        {
            Ok(output) => hints["date"] = output.data["date"].clone(),
            Err(e) => warn!(error = %e, "resolve_date_reference tool failed"),
        }

        hints
    }

    fn build_prompt(
        &self,
        input: &TranscriptionResult,
        hints: &Value,
        _ctx: &ExecutionContext,
    ) -> String {
        format!(
            "Transcript (confidence {:.2}, language {}):\n{}\n\n\
             Heuristic hints (may be wrong):\n{}\n\n\
             Default currency: {}\n\
             Today's date: {}\n",
            input.confidence,
            input.language,
            input.text,
            hints,
            self.default_currency,
            Utc::now().date_naive(),
        )
    }

    fn parse_output(&self, raw: &str, input: &TranscriptionResult) -> Option<VoiceExpenseResult> {
        let draft: ExpenseDraft = extractor::parse_structured(raw)?;

        Some(VoiceExpenseResult {
            transcript: input.text.clone(),
            transcript_confidence: input.confidence,
            language: input.language.clone(),
            expense: ExtractedExpense {
                amount: draft.amount,
                currency: draft
                    .currency
                    .unwrap_or_else(|| self.default_currency.clone()),
                description: draft.description,
                merchant: draft.merchant,
                category: draft.category,
                date: draft.date,
                confidence: draft.confidence,
            },
            clarifications: Vec::new(),
        })
    }

    fn fallback(&self, input: &TranscriptionResult) -> VoiceExpenseResult {
        VoiceExpenseResult {
            transcript: input.text.clone(),
            transcript_confidence: input.confidence,
            language: input.language.clone(),
            expense: ExtractedExpense {
                amount: None,
                currency: self.default_currency.clone(),
                description: Some(input.text.clone()),
                merchant: None,
                category: None,
                date: None,
                confidence: self.fallback_confidence,
            },
            clarifications: Vec::new(),
        }
    }

    fn post_process(&self, output: &mut VoiceExpenseResult, input: &TranscriptionResult) {
        let expense = &mut output.expense;

        expense.confidence = expense.confidence.clamp(0.0, 1.0);
        if expense.currency.is_empty() {
            expense.currency = self.default_currency.clone();
        }
        // Deterministic backstop for a model that missed the amount:
        // numerals first, word numbers only when the numeral pattern fails.
        if expense.amount.is_none() {
            expense.amount = parsing::extract_amount(&input.text)
                .or_else(|| parsing::parse_spoken_amount(&input.text));
        }

        let overall = expense.confidence.min(input.confidence);

        output.clarifications.clear();
        if expense.amount.is_none() {
            output.clarifications.push(CLARIFY_AMOUNT.to_string());
        }
        if overall < self.clarification_threshold {
            output.clarifications.push(CLARIFY_REVIEW_ALL.to_string());
        }
    }

    fn event(&self, output: &VoiceExpenseResult, ctx: &ExecutionContext) -> AgentEvent {
        AgentEvent::VoiceTranscribed {
            request_id: ctx.request_id,
            transcript_confidence: output.transcript_confidence,
            amount_extracted: output.expense.amount.is_some(),
            clarifications: output.clarifications.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryExecutionLog;
    use crate::error::AgentError;
    use crate::events::InMemoryEventSink;
    use crate::models::ExecutionStatus;
    use crate::reasoning::MockReasoner;
    use crate::stt::MockStt;
    use std::sync::Arc;
    use uuid::Uuid;

    fn agent() -> VoiceAgent {
        VoiceAgent::new(&AgentConfig::default())
    }

    fn transcript(text: &str, confidence: f32) -> TranscriptionResult {
        TranscriptionResult {
            text: text.to_string(),
            confidence,
            language: "en".to_string(),
            alternatives: vec![],
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_fallback_carries_raw_transcript() {
        let agent = agent();
        let result = agent.fallback(&transcript("mumble mumble", 0.9));

        assert_eq!(result.expense.amount, None);
        assert_eq!(result.expense.currency, "INR");
        assert_eq!(result.expense.description.as_deref(), Some("mumble mumble"));
        assert!((result.expense.confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_low_transcript_confidence_requests_review_only() {
        // Amount extracted, transcript weak: review everything, but do not
        // ask for the amount again.
        let agent = agent();
        let input = transcript("paid ₹300 at Dominos", 0.4);

        let mut output = agent.parse_output(
            r#"{"amount": 300, "currency": "INR", "description": "pizza", "merchant": "Dominos", "category": "food", "date": null, "confidence": 0.9}"#,
            &input,
        )
        .unwrap();
        agent.post_process(&mut output, &input);

        assert_eq!(output.clarifications, vec![CLARIFY_REVIEW_ALL.to_string()]);
    }

    #[test]
    fn test_missing_amount_requests_amount() {
        let agent = agent();
        let input = transcript("bought some snacks at the corner shop", 0.95);

        let mut output = agent.parse_output(
            r#"{"amount": null, "currency": "INR", "description": "snacks", "merchant": null, "category": "food", "date": null, "confidence": 0.85}"#,
            &input,
        )
        .unwrap();
        agent.post_process(&mut output, &input);

        assert_eq!(output.clarifications, vec![CLARIFY_AMOUNT.to_string()]);
    }

    #[test]
    fn test_both_clarifications_fire_independently() {
        let agent = agent();
        let input = transcript("mumble", 0.2);

        let mut output = agent.fallback(&input);
        agent.post_process(&mut output, &input);

        assert_eq!(
            output.clarifications,
            vec![CLARIFY_AMOUNT.to_string(), CLARIFY_REVIEW_ALL.to_string()]
        );
    }

    #[test]
    fn test_post_process_backstops_spoken_amount() {
        let agent = agent();
        let input = transcript("I spent fifty rupees on chai at CCD", 0.9);

        let mut output = agent.fallback(&input);
        agent.post_process(&mut output, &input);

        assert_eq!(output.expense.amount, Some(50.0));
        assert!(!output.clarifications.contains(&CLARIFY_AMOUNT.to_string()));
    }

    #[tokio::test]
    async fn test_process_runs_full_lifecycle() {
        let log = Arc::new(InMemoryExecutionLog::new());
        let events = Arc::new(InMemoryEventSink::new());
        let runtime = AgentRuntime::new(
            Arc::new(MockReasoner::with_text(
                r#"{"amount": 200, "currency": "INR", "description": "cab ride", "merchant": "Uber", "category": "transport", "date": null, "confidence": 0.9}"#,
            )),
            log.clone(),
            events.clone(),
        );
        let agent = agent();
        let stt = MockStt {
            text: "Paid two hundred for Uber last night".to_string(),
            confidence: 0.92,
        };

        let result = agent
            .process(&runtime, &stt, &ctx(), "https://cdn.example/note.ogg", None)
            .await
            .unwrap();

        assert_eq!(result.expense.amount, Some(200.0));
        assert_eq!(result.expense.merchant.as_deref(), Some("Uber"));
        assert!(result.clarifications.is_empty());
        assert_eq!(log.len().await, 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events.drain()[0].event_type(), "voice.transcribed");
    }

    #[tokio::test]
    async fn test_transcription_failure_logs_exactly_one_entry() {
        struct BrokenStt;

        #[async_trait::async_trait]
        impl SpeechToText for BrokenStt {
            async fn transcribe(
                &self,
                _audio_url: &str,
                _language_hint: Option<&str>,
            ) -> crate::Result<TranscriptionResult> {
                Err(AgentError::Transcription("audio not fetchable".to_string()))
            }
        }

        let log = Arc::new(InMemoryExecutionLog::new());
        let events = Arc::new(InMemoryEventSink::new());
        let runtime = AgentRuntime::new(
            Arc::new(MockReasoner::with_text("{}")),
            log.clone(),
            events.clone(),
        );

        let result = agent()
            .process(&runtime, &BrokenStt, &ctx(), "https://cdn.example/a.ogg", None)
            .await;

        assert!(matches!(result, Err(AgentError::Transcription(_))));
        assert_eq!(log.len().await, 1);
        assert!(events.is_empty());

        let entry = log.entries().await.pop().unwrap();
        assert_eq!(entry.status, ExecutionStatus::Failure);
        assert_eq!(entry.agent, "voice_expense");
    }
}
