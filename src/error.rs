//! Error types for the expense agent router

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Configuration & Upstream
    // =============================

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network failures and rate limits. Retried up to the budget, then surfaced.
    #[error("Transient upstream error: {0}")]
    TransientUpstream(String),

    /// Upstream rejected the request outright. Never retried.
    #[error("Upstream error: {0}")]
    Upstream(String),

    // =============================
    // Local Pipeline Errors
    // =============================

    /// Structured-output extraction failed. Absorbed by agent fallbacks,
    /// never surfaced to a caller.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid tool input: {0}")]
    Validation(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Audit error: {0}")]
    Audit(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
