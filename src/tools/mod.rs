//! Tool trait and registry
//!
//! Tools are deterministic, side-effect-free local computations an agent can
//! invoke while reasoning: keyword scans, numeral extraction, date
//! arithmetic. They never call the external reasoning client.

use crate::classifier;
use crate::error::AgentError;
use crate::models::{Intent, Modality, Processor, ToolInput, ToolOutput};
use crate::parsing;
use crate::Result;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// Declared type of a tool input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Num,
    Bool,
}

/// One declared input field.
#[derive(Debug, Clone, Copy)]
pub struct ToolParam {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

/// Trait for a single tool (deterministic execution)
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> &'static [ToolParam];
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Check the declared shape before execution: required fields must be
/// present and typed fields must match. Nothing beyond the declaration is
/// validated.
pub fn validate_input(schema: &[ToolParam], input: &ToolInput) -> Result<()> {
    let Some(params) = input.parameters.as_object() else {
        return Err(AgentError::Validation(
            "tool parameters must be a JSON object".to_string(),
        ));
    };

    for field in schema {
        // Explicit null counts as absent.
        match params.get(field.name).filter(|v| !v.is_null()) {
            None if field.required => {
                return Err(AgentError::Validation(format!(
                    "missing required field '{}'",
                    field.name
                )));
            }
            None => {}
            Some(value) => {
                let matches = match field.kind {
                    ParamKind::Str => value.is_string(),
                    ParamKind::Num => value.is_number(),
                    ParamKind::Bool => value.is_boolean(),
                };
                if !matches {
                    return Err(AgentError::Validation(format!(
                        "field '{}' has the wrong type",
                        field.name
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Tool registry: an ordered, fixed set declared at agent construction,
/// immutable thereafter.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Validate and execute a registered tool by name.
    pub async fn invoke(&self, name: &str, parameters: Value) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        let input = ToolInput {
            tool_name: name.to_string(),
            parameters,
        };
        validate_input(tool.schema(), &input)?;
        tool.execute(&input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn str_param<'a>(input: &'a ToolInput, key: &str) -> &'a str {
    input
        .parameters
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn parse_intent(s: &str) -> Option<Intent> {
    match s {
        "add_expense" => Some(Intent::AddExpense),
        "query_expenses" => Some(Intent::QueryExpenses),
        "split_expense" => Some(Intent::SplitExpense),
        "get_insights" => Some(Intent::GetInsights),
        "unknown" => Some(Intent::Unknown),
        _ => None,
    }
}

fn parse_modality(s: &str) -> Option<Modality> {
    match s {
        "voice" => Some(Modality::Voice),
        "image" => Some(Modality::Image),
        "text" => Some(Modality::Text),
        "sms" => Some(Modality::Sms),
        _ => None,
    }
}

/// Keyword-precedence intent detection.
pub struct DetectIntentTool;

const DETECT_INTENT_SCHEMA: &[ToolParam] = &[
    ToolParam {
        name: "text",
        kind: ParamKind::Str,
        required: true,
    },
    ToolParam {
        name: "modality",
        kind: ParamKind::Str,
        required: false,
    },
];

#[async_trait::async_trait]
impl Tool for DetectIntentTool {
    fn name(&self) -> &'static str {
        "detect_intent"
    }

    fn description(&self) -> &'static str {
        "Classify the user's intent from keyword heuristics"
    }

    fn schema(&self) -> &'static [ToolParam] {
        DETECT_INTENT_SCHEMA
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let text = str_param(input, "text");
        let modality = parse_modality(str_param(input, "modality")).unwrap_or(Modality::Text);

        let (intent, confidence) = classifier::classify_intent(text, modality);

        Ok(ToolOutput {
            success: true,
            data: json!({ "intent": intent, "confidence": confidence }),
            error: None,
        })
    }
}

/// Currency-marked numeral extraction.
pub struct ExtractAmountTool;

const TEXT_ONLY_SCHEMA: &[ToolParam] = &[ToolParam {
    name: "text",
    kind: ParamKind::Str,
    required: true,
}];

#[async_trait::async_trait]
impl Tool for ExtractAmountTool {
    fn name(&self) -> &'static str {
        "extract_amount"
    }

    fn description(&self) -> &'static str {
        "Extract the first currency-marked amount from text"
    }

    fn schema(&self) -> &'static [ToolParam] {
        TEXT_ONLY_SCHEMA
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let amount = parsing::extract_amount(str_param(input, "text"));

        Ok(ToolOutput {
            success: true,
            data: json!({ "amount": amount }),
            error: None,
        })
    }
}

/// Routing-table lookup from intent and modality.
pub struct SelectProcessorTool;

const SELECT_PROCESSOR_SCHEMA: &[ToolParam] = &[
    ToolParam {
        name: "intent",
        kind: ParamKind::Str,
        required: true,
    },
    ToolParam {
        name: "modality",
        kind: ParamKind::Str,
        required: true,
    },
];

#[async_trait::async_trait]
impl Tool for SelectProcessorTool {
    fn name(&self) -> &'static str {
        "select_processor"
    }

    fn description(&self) -> &'static str {
        "Select the downstream processor for an intent and modality"
    }

    fn schema(&self) -> &'static [ToolParam] {
        SELECT_PROCESSOR_SCHEMA
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let intent = parse_intent(str_param(input, "intent")).ok_or_else(|| {
            AgentError::Validation(format!("unknown intent '{}'", str_param(input, "intent")))
        })?;
        let modality = parse_modality(str_param(input, "modality")).ok_or_else(|| {
            AgentError::Validation(format!(
                "unknown modality '{}'",
                str_param(input, "modality")
            ))
        })?;

        let processor = Processor::route(intent, modality);

        Ok(ToolOutput {
            success: true,
            data: json!({
                "processor": processor.name(),
                "requires_user_confirmation": intent == Intent::Unknown,
            }),
            error: None,
        })
    }
}

/// Spoken amount parsing: numerals first, word numbers only when the
/// numeral pattern fails.
pub struct ParseSpokenAmountTool;

#[async_trait::async_trait]
impl Tool for ParseSpokenAmountTool {
    fn name(&self) -> &'static str {
        "parse_spoken_amount"
    }

    fn description(&self) -> &'static str {
        "Parse an amount from a spoken sentence, including word numbers"
    }

    fn schema(&self) -> &'static [ToolParam] {
        TEXT_ONLY_SCHEMA
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let text = str_param(input, "text");
        let amount = parsing::extract_amount(text).or_else(|| parsing::parse_spoken_amount(text));

        Ok(ToolOutput {
            success: true,
            data: json!({ "amount": amount }),
            error: None,
        })
    }
}

/// Relative date resolution ("yesterday", "3 days ago", "last week").
pub struct ResolveDateTool;

const RESOLVE_DATE_SCHEMA: &[ToolParam] = &[
    ToolParam {
        name: "text",
        kind: ParamKind::Str,
        required: true,
    },
    ToolParam {
        name: "today",
        kind: ParamKind::Str,
        required: false,
    },
];

#[async_trait::async_trait]
impl Tool for ResolveDateTool {
    fn name(&self) -> &'static str {
        "resolve_date_reference"
    }

    fn description(&self) -> &'static str {
        "Resolve a relative date reference to a calendar date"
    }

    fn schema(&self) -> &'static [ToolParam] {
        RESOLVE_DATE_SCHEMA
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let today = input
            .parameters
            .get("today")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<NaiveDate>().ok())
            .unwrap_or_else(|| Utc::now().date_naive());

        let date = parsing::resolve_date_reference(str_param(input, "text"), today);

        Ok(ToolOutput {
            success: true,
            data: json!({ "date": date }),
            error: None,
        })
    }
}

/// Tools available to the router agent.
pub fn router_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DetectIntentTool));
    registry.register(Arc::new(ExtractAmountTool));
    registry.register(Arc::new(SelectProcessorTool));
    registry
}

/// Tools available to the voice agent.
pub fn voice_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ParseSpokenAmountTool));
    registry.register(Arc::new(ResolveDateTool));
    registry.register(Arc::new(ExtractAmountTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detect_intent_tool() {
        let registry = router_registry();
        let output = registry
            .invoke(
                "detect_intent",
                json!({ "text": "I spent 200 rupees on lunch", "modality": "text" }),
            )
            .await
            .unwrap();

        assert_eq!(output.data["intent"], "add_expense");
        assert!((output.data["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_rejected() {
        let registry = router_registry();
        let result = registry.invoke("detect_intent", json!({})).await;
        assert!(matches!(result, Err(AgentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_wrongly_typed_field_is_rejected() {
        let registry = router_registry();
        let result = registry
            .invoke("detect_intent", json!({ "text": 42 }))
            .await;
        assert!(matches!(result, Err(AgentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unregistered_tool() {
        let registry = router_registry();
        let result = registry.invoke("nonexistent", json!({})).await;
        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_select_processor_tool() {
        let registry = router_registry();
        let output = registry
            .invoke(
                "select_processor",
                json!({ "intent": "add_expense", "modality": "voice" }),
            )
            .await
            .unwrap();

        assert_eq!(output.data["processor"], "voice_expense_processor");
        assert_eq!(output.data["requires_user_confirmation"], false);

        let output = registry
            .invoke(
                "select_processor",
                json!({ "intent": "unknown", "modality": "text" }),
            )
            .await
            .unwrap();
        assert_eq!(output.data["processor"], "manual_review");
        assert_eq!(output.data["requires_user_confirmation"], true);
    }

    #[tokio::test]
    async fn test_spoken_amount_prefers_numerals() {
        let registry = voice_registry();
        let output = registry
            .invoke(
                "parse_spoken_amount",
                json!({ "text": "paid ₹75 not seventy" }),
            )
            .await
            .unwrap();
        assert_eq!(output.data["amount"], 75.0);

        let output = registry
            .invoke("parse_spoken_amount", json!({ "text": "paid seventy" }))
            .await
            .unwrap();
        assert_eq!(output.data["amount"], 70.0);
    }

    #[tokio::test]
    async fn test_resolve_date_tool() {
        let registry = voice_registry();
        let output = registry
            .invoke(
                "resolve_date_reference",
                json!({ "text": "dinner yesterday", "today": "2026-08-05" }),
            )
            .await
            .unwrap();
        assert_eq!(output.data["date"], "2026-08-04");

        let output = registry
            .invoke(
                "resolve_date_reference",
                json!({ "text": "dinner sometime", "today": "2026-08-05" }),
            )
            .await
            .unwrap();
        assert!(output.data["date"].is_null());
    }

    #[test]
    fn test_registry_preserves_registration_order() {
        let registry = router_registry();
        assert_eq!(
            registry.list(),
            vec!["detect_intent", "extract_amount", "select_processor"]
        );
    }
}
