//! Core data models for the expense agent router

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// Classified purpose of a user request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AddExpense,
    QueryExpenses,
    SplitExpense,
    GetInsights,
    Unknown,
}

/// Input channel declared by the caller. `Auto` asks the router to infer it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Auto,
    Voice,
    Image,
    Text,
    Sms,
}

/// Resolved input channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Voice,
    Image,
    Text,
    Sms,
}

/// Downstream processors the router can hand a request to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Processor {
    VoiceExpense,
    ReceiptOcr,
    TextClassifier,
    SmsParser,
    ExpenseQuery,
    Settlement,
    Insights,
    ManualReview,
}

impl Processor {
    /// Stable wire name handed to the external dispatcher.
    pub fn name(self) -> &'static str {
        match self {
            Self::VoiceExpense => "voice_expense_processor",
            Self::ReceiptOcr => "receipt_ocr_processor",
            Self::TextClassifier => "text_classifier_processor",
            Self::SmsParser => "sms_parser_processor",
            Self::ExpenseQuery => "expense_query",
            Self::Settlement => "settlement_processor",
            Self::Insights => "insights_processor",
            Self::ManualReview => "manual_review",
        }
    }

    /// Fixed routing table from intent and modality. Exhaustive by
    /// construction: adding an intent or modality forces an update here.
    pub fn route(intent: Intent, modality: Modality) -> Processor {
        match intent {
            Intent::AddExpense => match modality {
                Modality::Voice => Self::VoiceExpense,
                Modality::Image => Self::ReceiptOcr,
                Modality::Text => Self::TextClassifier,
                Modality::Sms => Self::SmsParser,
            },
            Intent::QueryExpenses => Self::ExpenseQuery,
            Intent::SplitExpense => Self::Settlement,
            Intent::GetInsights => Self::Insights,
            Intent::Unknown => Self::ManualReview,
        }
    }
}

//
// ================= Execution Context =================
//

/// Identifies the acting user and call. Created fresh per inbound call and
/// immutable for the call's duration; passed through to the log and event
/// collaborators, never persisted by the core itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub request_id: Uuid,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(user_id: Uuid, session_id: Uuid) -> Self {
        Self {
            user_id,
            session_id,
            request_id: Uuid::new_v4(),
            metadata: HashMap::new(),
        }
    }
}

//
// ================= Router I/O =================
//

/// Normalized inbound request as the router sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterInput {
    #[serde(default)]
    pub input_type: InputType,
    pub text: Option<String>,
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
    pub sms_text: Option<String>,
}

impl RouterInput {
    /// Plain text request with everything else defaulted.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            input_type: InputType::Auto,
            text: Some(text.into()),
            audio_url: None,
            image_url: None,
            sms_text: None,
        }
    }

    /// Text used for classification: the SMS body when present, else the
    /// free-text message.
    pub fn text_content(&self) -> &str {
        self.sms_text
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }
}

/// The router's output: produced once per routed request, returned to the
/// caller, never mutated after creation. Actual dispatch to the named
/// processor is the caller's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterDecision {
    pub intent: Intent,
    pub processor: Processor,
    pub confidence: f32,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    pub reasoning: String,
    #[serde(default)]
    pub requires_user_confirmation: bool,
}

//
// ================= Reasoning =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw text from the reasoning call plus usage accounting. Ephemeral:
/// consumed immediately by the structured-output extractor.
#[derive(Debug, Clone)]
pub struct ReasoningResult {
    pub text: String,
    pub usage: TokenUsage,
}

//
// ================= Transcription =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub confidence: f32,
    pub language: String,
    /// Provider-ranked alternates, best first, primary excluded. At most two.
    #[serde(default)]
    pub alternatives: Vec<String>,
}

//
// ================= Voice Expense =================
//

/// Expense fields extracted from a transcript. Null amount and date mean
/// "ask the user", never zero or today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedExpense {
    pub amount: Option<f64>,
    pub currency: String,
    pub description: Option<String>,
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub confidence: f32,
}

/// The voice agent's output payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceExpenseResult {
    pub transcript: String,
    pub transcript_confidence: f32,
    pub language: String,
    pub expense: ExtractedExpense,
    pub clarifications: Vec<String>,
}

//
// ================= Execution Log =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

/// One append-only entry per agent invocation, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub entry_id: Uuid,
    pub agent: String,
    pub context: ExecutionContext,
    pub input: Value,
    pub input_hash: String,
    pub output: Option<Value>,
    pub status: ExecutionStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub total_tokens: Option<u32>,
    pub created_at: DateTime<Utc>,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intent::AddExpense => "add_expense",
            Intent::QueryExpenses => "query_expenses",
            Intent::SplitExpense => "split_expense",
            Intent::GetInsights => "get_insights",
            Intent::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Modality::Voice => "voice",
            Modality::Image => "image",
            Modality::Text => "text",
            Modality::Sms => "sms",
        };
        write!(f, "{}", s)
    }
}
