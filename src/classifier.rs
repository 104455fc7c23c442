//! Intent and modality classification
//!
//! Deterministic keyword heuristics, used both as a registered tool and as
//! guidance embedded in the router's system instruction. Keep these pure so
//! accuracy is testable without any external dependency.

use crate::models::{InputType, Intent, Modality, RouterInput};

/// Static keyword lists — zero allocation
const EXPENSE_KEYWORDS: &[&str] = &[
    // Verbs
    "spent", "paid", "bought", "purchased",
    // Nouns
    "cost", "bill for",
    // Currency markers
    "₹", "rs.", "rupees", "inr", "$", "dollars",
];

const QUERY_KEYWORDS: &[&str] = &[
    "how much", "show me", "list", "what did i", "history", "summary of",
];

const SPLIT_KEYWORDS: &[&str] = &["split", "share", "divide", "owes me", "settle up"];

const INSIGHT_KEYWORDS: &[&str] = &[
    "suggest", "recommend", "analyze", "insight", "advice", "trend",
];

/// Confidence assigned by each precedence rule. Hand-tuned; change with care.
pub const IMAGE_INTENT_CONFIDENCE: f32 = 0.9;
pub const EXPENSE_INTENT_CONFIDENCE: f32 = 0.85;
pub const SPLIT_INTENT_CONFIDENCE: f32 = 0.8;
pub const QUERY_INTENT_CONFIDENCE: f32 = 0.75;
pub const INSIGHT_INTENT_CONFIDENCE: f32 = 0.7;
pub const UNKNOWN_INTENT_CONFIDENCE: f32 = 0.5;

fn has_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

/// Classify intent from the input text and resolved modality.
///
/// The rule order is a deliberate precedence, not independent scoring: only
/// the first matching rule applies. Image inputs are always expense captures
/// regardless of any accompanying text.
pub fn classify_intent(text: &str, modality: Modality) -> (Intent, f32) {
    if modality == Modality::Image {
        return (Intent::AddExpense, IMAGE_INTENT_CONFIDENCE);
    }

    let lowered = text.to_lowercase();
    let has_expense = has_any(&lowered, EXPENSE_KEYWORDS);
    let has_query = has_any(&lowered, QUERY_KEYWORDS);

    if has_expense && !has_query {
        return (Intent::AddExpense, EXPENSE_INTENT_CONFIDENCE);
    }
    if has_any(&lowered, SPLIT_KEYWORDS) {
        return (Intent::SplitExpense, SPLIT_INTENT_CONFIDENCE);
    }
    if has_query {
        return (Intent::QueryExpenses, QUERY_INTENT_CONFIDENCE);
    }
    if has_any(&lowered, INSIGHT_KEYWORDS) {
        return (Intent::GetInsights, INSIGHT_INTENT_CONFIDENCE);
    }

    (Intent::Unknown, UNKNOWN_INTENT_CONFIDENCE)
}

/// Resolve the input channel. Total: every input gets a modality.
///
/// Explicit declarations bypass inference; `Auto` picks by reference
/// priority: audio, then image, then SMS text, then plain text.
pub fn classify_modality(input: &RouterInput) -> Modality {
    match input.input_type {
        InputType::Voice => Modality::Voice,
        InputType::Image => Modality::Image,
        InputType::Text => Modality::Text,
        InputType::Sms => Modality::Sms,
        InputType::Auto => {
            if input.audio_url.is_some() {
                Modality::Voice
            } else if input.image_url.is_some() {
                Modality::Image
            } else if input.sms_text.is_some() {
                Modality::Sms
            } else {
                Modality::Text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_keywords() {
        let cases = vec![
            "I spent 500 on groceries",
            "paid ₹120 for coffee",
            "bought a new charger",
            "auto fare cost 80 rupees",
        ];

        for c in cases {
            let (intent, confidence) = classify_intent(c, Modality::Text);
            assert_eq!(intent, Intent::AddExpense, "case: {}", c);
            assert!((confidence - EXPENSE_INTENT_CONFIDENCE).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_query_beats_expense_keyword_mix() {
        // Expense keyword present, but a query keyword demotes the expense
        // rule: the mix falls through to the query rule.
        let (intent, confidence) =
            classify_intent("show me how much I spent on food", Modality::Text);
        assert_eq!(intent, Intent::QueryExpenses);
        assert!((confidence - QUERY_INTENT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_split_precedes_query() {
        let (intent, _) = classify_intent("split the dinner bill, show me shares", Modality::Text);
        assert_eq!(intent, Intent::SplitExpense);
    }

    #[test]
    fn test_insight_keywords() {
        let (intent, confidence) = classify_intent("suggest where I can save", Modality::Text);
        assert_eq!(intent, Intent::GetInsights);
        assert!((confidence - INSIGHT_INTENT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_image_always_expense() {
        let (intent, confidence) = classify_intent("show me this", Modality::Image);
        assert_eq!(intent, Intent::AddExpense);
        assert!((confidence - IMAGE_INTENT_CONFIDENCE).abs() < f32::EPSILON);

        let (intent, confidence) = classify_intent("", Modality::Image);
        assert_eq!(intent, Intent::AddExpense);
        assert!(confidence >= 0.5);
    }

    #[test]
    fn test_unknown_fallthrough() {
        let (intent, confidence) = classify_intent("hello there", Modality::Text);
        assert_eq!(intent, Intent::Unknown);
        assert!((confidence - UNKNOWN_INTENT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_modality_priority_order() {
        let mut input = RouterInput::from_text("anything");
        assert_eq!(classify_modality(&input), Modality::Text);

        input.sms_text = Some("HDFC: Rs.500 debited".to_string());
        assert_eq!(classify_modality(&input), Modality::Sms);

        input.image_url = Some("https://cdn.example/receipt.jpg".to_string());
        assert_eq!(classify_modality(&input), Modality::Image);

        input.audio_url = Some("https://cdn.example/note.ogg".to_string());
        assert_eq!(classify_modality(&input), Modality::Voice);
    }

    #[test]
    fn test_explicit_input_type_bypasses_inference() {
        let mut input = RouterInput::from_text("spent 100");
        input.audio_url = Some("https://cdn.example/note.ogg".to_string());
        input.input_type = InputType::Sms;
        assert_eq!(classify_modality(&input), Modality::Sms);
    }
}
