//! Execution failure payload and interruption signals.
//!
//! # Responsibilities
//! - Define the only client-visible failure payload (status, key, message)
//! - Define the control-flow signals that short-circuit request execution
//!
//! # Design Decisions
//! - Interruptions are control-flow markers, not business errors
//! - Every controlled failure carries a stable machine-readable key
//! - Raw errors never cross the transport boundary; they are converted to
//!   an interruption before leaving the flow/invoker layer

use thiserror::Error;

/// Structured failure payload sent back to the client on any controlled failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    /// HTTP status code of the produced response.
    pub status_code: u16,
    /// Stable machine-readable failure code.
    pub key: String,
    /// Human-readable message, never empty.
    pub message: String,
}

impl ExecutionFailure {
    /// Create a new failure payload.
    pub fn new(status_code: u16, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            key: key.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.status_code, self.key, self.message)
    }
}

/// Control-flow signal raised to short-circuit the execution pipeline.
///
/// The reactor inspects the variant to decide which RESPONSE-leg chain runs.
#[derive(Debug, Error)]
pub enum Interruption {
    /// Deliberate early exit with no error semantics. Response finalization
    /// (post-processor chain, platform flow) still runs.
    #[error("execution interrupted")]
    Interrupted,

    /// Controlled failure. Only the error processor chain touches the
    /// response from here on.
    #[error("execution interrupted with failure: {0}")]
    Failure(ExecutionFailure),

    /// Unexpected error during invocation. Routed to the error processor
    /// chain like a failure, with a generic payload.
    #[error("unexpected execution error: {0}")]
    Technical(String),
}

impl Interruption {
    /// Returns true for the benign variant.
    pub fn is_benign(&self) -> bool {
        matches!(self, Interruption::Interrupted)
    }
}

/// Result of a single execution phase: completion or an interruption signal.
pub type PhaseResult = Result<(), Interruption>;
