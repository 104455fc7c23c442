//! Expense Agent Router
//!
//! The decision core of an expense assistant:
//! - Classifies heterogeneous input (free text, voice, receipt images, bank SMS)
//! - Combines keyword heuristics with model-based reasoning
//! - Degrades to deterministic fallbacks when the model output is unusable
//! - Tracks every agent invocation in an auditable execution log
//!
//! PIPELINE:
//! INPUT → CLASSIFY MODALITY → PROMPT → REASON → EXTRACT → LOG → EMIT → DECISION

pub mod agent;
pub mod audit;
pub mod background;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod extractor;
pub mod models;
pub mod parsing;
pub mod reasoning;
pub mod router;
pub mod stt;
pub mod tools;
pub mod voice;

pub use error::Result;

// Re-export common types
pub use classifier::{classify_intent, classify_modality};
pub use models::*;
pub use router::RouterAgent;
pub use voice::VoiceAgent;
