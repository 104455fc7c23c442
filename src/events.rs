//! Domain events emitted by agents
//!
//! One event per successful (or fallback-completed) invocation, none on
//! failure. Emission is best-effort and synchronous: a sink must be cheap
//! and must never block the caller's return path.

use crate::models::{Intent, Processor};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Typed events carrying a minimal summary of each decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The router produced a decision for a request.
    RoutingCompleted {
        request_id: Uuid,
        intent: Intent,
        processor: Processor,
        confidence: f32,
        requires_user_confirmation: bool,
    },
    /// The voice agent transcribed audio and extracted expense fields.
    VoiceTranscribed {
        request_id: Uuid,
        transcript_confidence: f32,
        amount_extracted: bool,
        clarifications: usize,
    },
}

impl AgentEvent {
    /// Canonical event type string for downstream consumers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoutingCompleted { .. } => "routing.completed",
            Self::VoiceTranscribed { .. } => "voice.transcribed",
        }
    }
}

/// Sink for domain events. Fire-and-forget from the agent's perspective.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

/// Emits events as structured log lines.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: AgentEvent) {
        info!(event_type = event.event_type(), payload = ?event, "Domain event");
    }
}

/// Collects events in memory for inspection in tests.
#[derive(Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<AgentEvent> {
        self.events
            .lock()
            .map(|mut events| events.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: AgentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
