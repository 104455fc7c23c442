//! Agent base contract
//!
//! Every concrete agent shares one execution lifecycle:
//!
//! PROMPT → TOOL HINTS → REASON → EXTRACT (or FALLBACK) → POST-PROCESS → LOG → EMIT
//!
//! Concrete agents supply the pieces through [`AgentSpec`]; the lifecycle
//! itself is fixed and lives in [`AgentRuntime::run`]. Every invocation
//! writes exactly one execution log entry, success or failure, and emits at
//! most one event (success only).

use crate::audit::{compute_input_hash, ExecutionLogSink};
use crate::error::AgentError;
use crate::events::{AgentEvent, EventSink};
use crate::models::{ExecutionContext, ExecutionLogEntry, ExecutionStatus, TokenUsage};
use crate::reasoning::Reasoner;
use crate::tools::ToolRegistry;
use crate::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The parts a concrete agent supplies to the shared lifecycle.
#[async_trait::async_trait]
pub trait AgentSpec: Send + Sync {
    type Input: Serialize + Send + Sync;
    type Output: Serialize + Send + Sync;

    fn name(&self) -> &'static str;

    /// Fixed system instruction describing the exact output shape expected.
    fn system_instruction(&self) -> &str;

    /// The agent's registered tool set, declared once at construction.
    fn tools(&self) -> &ToolRegistry;

    /// Invoke registered tools directly (not via the reasoning call) to
    /// pre-compute hints included in the prompt. A failed tool degrades
    /// hint quality, not correctness.
    async fn precompute_hints(&self, _input: &Self::Input) -> Value {
        Value::Null
    }

    fn build_prompt(&self, input: &Self::Input, hints: &Value, ctx: &ExecutionContext) -> String;

    /// Parse the raw reasoning response into the output shape. `None`
    /// triggers the deterministic fallback.
    fn parse_output(&self, raw: &str, input: &Self::Input) -> Option<Self::Output>;

    /// Deterministic substitute when parsing fails. Must always succeed.
    fn fallback(&self, input: &Self::Input) -> Self::Output;

    /// Clamp and derive secondary fields after extraction.
    fn post_process(&self, _output: &mut Self::Output, _input: &Self::Input) {}

    fn event(&self, output: &Self::Output, ctx: &ExecutionContext) -> AgentEvent;
}

/// Shared collaborators driving every agent invocation.
pub struct AgentRuntime {
    reasoning: Arc<dyn Reasoner>,
    log: Arc<dyn ExecutionLogSink>,
    events: Arc<dyn EventSink>,
}

impl AgentRuntime {
    pub fn new(
        reasoning: Arc<dyn Reasoner>,
        log: Arc<dyn ExecutionLogSink>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            reasoning,
            log,
            events,
        }
    }

    /// Run one agent invocation through the shared lifecycle.
    pub async fn run<S: AgentSpec>(
        &self,
        spec: &S,
        ctx: &ExecutionContext,
        input: S::Input,
    ) -> Result<S::Output> {
        self.run_cancellable(spec, ctx, input, CancellationToken::new())
            .await
    }

    /// Like [`AgentRuntime::run`], but short-circuits when `cancel` fires:
    /// the outstanding reasoning call is dropped and the invocation is
    /// logged as a failure with a cancellation error.
    pub async fn run_cancellable<S: AgentSpec>(
        &self,
        spec: &S,
        ctx: &ExecutionContext,
        input: S::Input,
        cancel: CancellationToken,
    ) -> Result<S::Output> {
        let start = Instant::now();
        let input_snapshot = serde_json::to_value(&input).unwrap_or(Value::Null);

        debug!(
            agent = spec.name(),
            request_id = ?ctx.request_id,
            "Agent invocation started"
        );

        let hints = spec.precompute_hints(&input).await;
        let prompt = spec.build_prompt(&input, &hints, ctx);

        let reasoning = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled(
                "caller withdrew the request".to_string(),
            )),
            result = self.reasoning.generate(spec.system_instruction(), &prompt) => result,
        };

        let (raw, usage) = match reasoning {
            Ok(result) => (result.text, result.usage),
            Err(err) => {
                self.record(
                    spec.name(),
                    ctx,
                    input_snapshot,
                    None,
                    ExecutionStatus::Failure,
                    Some(err.to_string()),
                    start,
                    None,
                )
                .await;
                return Err(err);
            }
        };

        // Parse failures are absorbed here: an unusable response degrades to
        // the agent's deterministic fallback instead of surfacing.
        let mut output = match spec.parse_output(&raw, &input) {
            Some(output) => output,
            None => {
                info!(
                    agent = spec.name(),
                    "Structured output extraction failed, using fallback"
                );
                spec.fallback(&input)
            }
        };

        spec.post_process(&mut output, &input);

        let output_snapshot = serde_json::to_value(&output).unwrap_or(Value::Null);
        self.record(
            spec.name(),
            ctx,
            input_snapshot,
            Some(output_snapshot),
            ExecutionStatus::Success,
            None,
            start,
            Some(usage),
        )
        .await;

        self.events.emit(spec.event(&output, ctx));

        debug!(
            agent = spec.name(),
            request_id = ?ctx.request_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Agent invocation complete"
        );

        Ok(output)
    }

    /// Record a failure for work that never reached the reasoning stage
    /// (e.g. transcription). Keeps the one-entry-per-invocation invariant
    /// for agents with pre-lifecycle steps.
    pub async fn record_failure(
        &self,
        agent: &str,
        ctx: &ExecutionContext,
        input: Value,
        error: &AgentError,
        start: Instant,
    ) {
        self.record(
            agent,
            ctx,
            input,
            None,
            ExecutionStatus::Failure,
            Some(error.to_string()),
            start,
            None,
        )
        .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        agent: &str,
        ctx: &ExecutionContext,
        input: Value,
        output: Option<Value>,
        status: ExecutionStatus,
        error: Option<String>,
        start: Instant,
        usage: Option<TokenUsage>,
    ) {
        let entry = ExecutionLogEntry {
            entry_id: Uuid::new_v4(),
            agent: agent.to_string(),
            context: ctx.clone(),
            input_hash: compute_input_hash(&input),
            input,
            output,
            status,
            error,
            duration_ms: start.elapsed().as_millis() as u64,
            total_tokens: usage.map(TokenUsage::total),
            created_at: Utc::now(),
        };

        // A failing sink is reported but never masks the invocation's own
        // outcome.
        if let Err(e) = self.log.record(entry).await {
            warn!(agent, error = %e, "Execution log write failed");
        }
    }
}
