//! Router agent
//!
//! Classifies intent, extracts entities, and selects the downstream
//! processor over the shared agent lifecycle. An unusable reasoning
//! response degrades to a deterministic modality-based route.

use crate::agent::AgentSpec;
use crate::classifier::classify_modality;
use crate::config::AgentConfig;
use crate::events::AgentEvent;
use crate::extractor;
use crate::models::{
    ExecutionContext, Intent, Processor, RouterDecision, RouterInput,
};
use crate::tools::{router_registry, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Reasoning text attached to fallback decisions.
pub const FALLBACK_REASONING: &str = "fallback routing based on input type";

const SYSTEM_INSTRUCTION: &str = r#"You are the routing layer of an expense assistant.

Given a user's message, decide what they want:
- add_expense: recording money spent ("spent", "paid", "bought", amounts with currency)
- query_expenses: asking about past spending ("how much", "show me", "list")
- split_expense: dividing a bill with others ("split", "share", "divide")
- get_insights: asking for analysis or advice ("suggest", "recommend", "analyze")
- unknown: none of the above fits

Extract any obvious parameters (amount, merchant, category, participants, period).

Return ONLY a JSON object, no explanation text:

{
  "intent": "add_expense",
  "confidence": 0.0,
  "params": {},
  "next_steps": ["..."],
  "reasoning": "..."
}"#;

/// Draft shape the model is asked to produce. The processor is never taken
/// from the model; the routing table is authoritative.
#[derive(Debug, Deserialize)]
struct RouterDraft {
    intent: Intent,
    confidence: f32,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    next_steps: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

pub struct RouterAgent {
    tools: ToolRegistry,
    fallback_confidence: f32,
}

impl RouterAgent {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            tools: router_registry(),
            fallback_confidence: config.router_fallback_confidence,
        }
    }
}

#[async_trait::async_trait]
impl AgentSpec for RouterAgent {
    type Input = RouterInput;
    type Output = RouterDecision;

    fn name(&self) -> &'static str {
        "router"
    }

    fn system_instruction(&self) -> &str {
        SYSTEM_INSTRUCTION
    }

    fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    async fn precompute_hints(&self, input: &RouterInput) -> Value {
        let modality = classify_modality(input);
        let text = input.text_content();

        let mut hints = json!({ "modality": modality });

        match self
            .tools
            .invoke(
                "detect_intent",
                json!({ "text": text, "modality": modality.to_string() }),
            )
            .await
        {
            Ok(output) => hints["heuristic"] = output.data,
            Err(e) => warn!(error = %e, "detect_intent tool failed"),
        }

        match self
            .tools
            .invoke("extract_amount", json!({ "text": text }))
            .await
        {
            Ok(output) => hints["amount"] = output.data["amount"].clone(),
            Err(e) => warn!(error = %e, "extract_amount tool failed"),
        }

        hints
    }

    fn build_prompt(&self, input: &RouterInput, hints: &Value, ctx: &ExecutionContext) -> String {
        format!(
            "Request {} from user {}.\n\n\
             Input modality: {}\n\
             Message:\n{}\n\n\
             Heuristic hints (keyword-based, may be wrong):\n{}\n",
            ctx.request_id,
            ctx.user_id,
            classify_modality(input),
            input.text_content(),
            hints,
        )
    }

    fn parse_output(&self, raw: &str, input: &RouterInput) -> Option<RouterDecision> {
        let draft: RouterDraft = extractor::parse_structured(raw)?;
        let modality = classify_modality(input);

        Some(RouterDecision {
            intent: draft.intent,
            processor: Processor::route(draft.intent, modality),
            confidence: draft.confidence,
            params: draft.params,
            next_steps: draft.next_steps,
            reasoning: draft.reasoning,
            requires_user_confirmation: false,
        })
    }

    fn fallback(&self, input: &RouterInput) -> RouterDecision {
        let modality = classify_modality(input);

        RouterDecision {
            intent: Intent::AddExpense,
            processor: Processor::route(Intent::AddExpense, modality),
            confidence: self.fallback_confidence,
            params: Map::new(),
            next_steps: Vec::new(),
            reasoning: FALLBACK_REASONING.to_string(),
            requires_user_confirmation: false,
        }
    }

    fn post_process(&self, output: &mut RouterDecision, input: &RouterInput) {
        output.confidence = output.confidence.clamp(0.0, 1.0);
        // The routing table is authoritative even when the model disagrees.
        output.processor = Processor::route(output.intent, classify_modality(input));
        output.requires_user_confirmation = output.intent == Intent::Unknown;
    }

    fn event(&self, output: &RouterDecision, ctx: &ExecutionContext) -> AgentEvent {
        AgentEvent::RoutingCompleted {
            request_id: ctx.request_id,
            intent: output.intent,
            processor: output.processor,
            confidence: output.confidence,
            requires_user_confirmation: output.requires_user_confirmation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier;
    use crate::models::{InputType, Modality};

    fn router() -> RouterAgent {
        RouterAgent::new(&AgentConfig::default())
    }

    fn image_input() -> RouterInput {
        RouterInput {
            input_type: InputType::Auto,
            text: Some("receipt attached".to_string()),
            audio_url: None,
            image_url: Some("https://cdn.example/receipt.jpg".to_string()),
            sms_text: None,
        }
    }

    #[test]
    fn test_fallback_routes_by_modality() {
        let agent = router();

        let mut voice = RouterInput::from_text("");
        voice.audio_url = Some("https://cdn.example/note.ogg".to_string());
        let decision = agent.fallback(&voice);
        assert_eq!(decision.intent, Intent::AddExpense);
        assert_eq!(decision.processor, Processor::VoiceExpense);
        assert!((decision.confidence - 0.5).abs() < f32::EPSILON);
        assert_eq!(decision.reasoning, FALLBACK_REASONING);

        let decision = agent.fallback(&image_input());
        assert_eq!(decision.processor, Processor::ReceiptOcr);
    }

    #[test]
    fn test_image_intent_both_paths_agree() {
        // Primary heuristic path and fallback path must both yield
        // add_expense for image inputs with at least fallback confidence.
        let input = image_input();
        let modality = classifier::classify_modality(&input);
        assert_eq!(modality, Modality::Image);

        let (intent, confidence) = classifier::classify_intent(input.text_content(), modality);
        assert_eq!(intent, Intent::AddExpense);
        assert!(confidence >= 0.5);

        let fallback = router().fallback(&input);
        assert_eq!(fallback.intent, Intent::AddExpense);
        assert!(fallback.confidence >= 0.5);
    }

    #[test]
    fn test_parse_output_accepts_prose_wrapped_json() {
        let agent = router();
        let raw = r#"Here is my decision:
{"intent": "split_expense", "confidence": 0.8, "params": {"participants": 4}, "next_steps": ["compute shares"], "reasoning": "split wording"}"#;

        let decision = agent
            .parse_output(raw, &RouterInput::from_text("split dinner 4 ways"))
            .unwrap();

        assert_eq!(decision.intent, Intent::SplitExpense);
        assert_eq!(decision.processor, Processor::Settlement);
        assert_eq!(decision.params["participants"], 4);
    }

    #[test]
    fn test_parse_output_rejects_unknown_intent_string() {
        let agent = router();
        let raw = r#"{"intent": "delete_account", "confidence": 0.9, "reasoning": "?"}"#;
        assert!(agent
            .parse_output(raw, &RouterInput::from_text("whatever"))
            .is_none());
    }

    #[test]
    fn test_post_process_flags_unknown_for_confirmation() {
        let agent = router();
        let input = RouterInput::from_text("ummm");

        let mut decision = agent.fallback(&input);
        decision.intent = Intent::Unknown;
        decision.confidence = 1.7;
        agent.post_process(&mut decision, &input);

        assert!(decision.requires_user_confirmation);
        assert_eq!(decision.processor, Processor::ManualReview);
        assert!(decision.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_hints_include_heuristic_intent() {
        let agent = router();
        let hints = agent
            .precompute_hints(&RouterInput::from_text("I spent ₹450 at BigBasket"))
            .await;

        assert_eq!(hints["modality"], "text");
        assert_eq!(hints["heuristic"]["intent"], "add_expense");
        assert_eq!(hints["amount"], 450.0);
    }
}
