//! Lifecycle error types
//!
//! Every expected business condition is a variant of [`LifecycleError`];
//! only an unavailable store surfaces as a generic failure. Errors can be
//! rendered as a [`StructuredError`] so the transport layer maps them by
//! `code` instead of inspecting message text.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{Priority, StoreError, WorkOrderId, WorkOrderStatus};
use crate::transitions::Rejection;

/// Result type alias for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

// ============================================================================
// Structured Error Response
// ============================================================================

/// Transport-neutral error payload.
///
/// # Example Response
/// ```json
/// {
///   "code": "INVALID_TRANSITION",
///   "message": "Invalid transition NEW -> CLOSED: no such edge",
///   "recovery_action": "Choose one of the valid transitions for the current status",
///   "context": {
///     "from": "NEW",
///     "to": "CLOSED",
///     "valid_transitions": ["ASSESSMENT", "CANCELLED"]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code (e.g., "INVALID_TRANSITION")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// What the caller can do about it
    pub recovery_action: String,

    /// Relevant context for debugging and recovery
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Whether retrying the same request may succeed
    #[serde(default)]
    pub retryable: bool,
}

impl StructuredError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        recovery_action: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            recovery_action: recovery_action.into(),
            context: HashMap::new(),
            retryable: false,
        }
    }

    /// Add context key-value pair
    pub fn with_context(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for StructuredError {}

/// Domain rules checked before any write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Escalation requested at the top of the ladder
    AlreadyMaximumPriority { current: Priority },
    /// Escalation target does not outrank the current priority
    NonIncreasingPriority { current: Priority, target: Priority },
    /// Assignment or escalation attempted on a closed or cancelled order
    InactiveOrder { status: WorkOrderStatus },
    /// Free-text reason or note exceeds the configured limit
    ReasonTooLong { len: usize, max: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyMaximumPriority { current } => {
                write!(f, "already at maximum priority ({})", current)
            }
            Self::NonIncreasingPriority { current, target } => write!(
                f,
                "cannot escalate to same or lower priority ({} -> {})",
                current, target
            ),
            Self::InactiveOrder { status } => {
                write!(f, "work order is {} and no longer active", status)
            }
            Self::ReasonTooLong { len, max } => {
                write!(f, "reason is {} characters, limit is {}", len, max)
            }
        }
    }
}

/// Errors returned by the lifecycle engine
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Absent, or owned by another tenant. Deliberately not distinguished.
    #[error("Work order not found or access denied")]
    NotFoundOrDenied,

    #[error("Invalid transition {from} -> {to}: {rejection}")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        rejection: Rejection,
        valid_transitions: Vec<WorkOrderStatus>,
    },

    #[error("Invalid identifier for {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    /// The compare-and-swap matched nothing; re-read and retry
    #[error("Work order {work_order_id} was modified concurrently")]
    ConcurrentModification { work_order_id: WorkOrderId },

    #[error("Invariant violation: {0}")]
    InvariantViolation(Violation),

    #[error("Persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// Build an `InvalidTransition` with the valid edges for `from`
    pub fn invalid_transition(
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        rejection: Rejection,
    ) -> Self {
        Self::InvalidTransition {
            from,
            to,
            rejection,
            valid_transitions: crate::transitions::valid_transitions(from),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFoundOrDenied => "NOT_FOUND_OR_DENIED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Whether the same request may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. } | Self::Store(_))
    }

    /// Render as a transport-neutral payload
    pub fn to_structured(&self) -> StructuredError {
        let error = match self {
            Self::NotFoundOrDenied => StructuredError::new(
                self.code(),
                self.to_string(),
                "Check the work order id and the organization it belongs to",
            ),
            Self::InvalidTransition {
                from,
                to,
                rejection,
                valid_transitions,
            } => StructuredError::new(
                self.code(),
                self.to_string(),
                "Choose one of the valid transitions for the current status",
            )
            .with_context("from", from.as_str())
            .with_context("to", to.as_str())
            .with_context(
                "rejection",
                serde_json::to_value(rejection).unwrap_or_default(),
            )
            .with_context(
                "valid_transitions",
                valid_transitions
                    .iter()
                    .map(|s| serde_json::Value::from(s.as_str()))
                    .collect::<Vec<_>>(),
            ),
            Self::InvalidIdentifier { field, value } => StructuredError::new(
                self.code(),
                self.to_string(),
                "Send a well-formed UUID",
            )
            .with_context("field", *field)
            .with_context("value", value.clone()),
            Self::ConcurrentModification { work_order_id } => StructuredError::new(
                self.code(),
                self.to_string(),
                "Re-read the work order and retry against its current status",
            )
            .with_context("work_order_id", work_order_id.to_string()),
            Self::InvariantViolation(violation) => StructuredError::new(
                self.code(),
                self.to_string(),
                "Adjust the request; nothing was written",
            )
            .with_context(
                "violation",
                serde_json::to_value(violation).unwrap_or_default(),
            ),
            Self::Store(_) => StructuredError::new(
                self.code(),
                self.to_string(),
                "Retry later; nothing was written",
            ),
        };

        if self.is_retryable() {
            error.retryable()
        } else {
            error
        }
    }
}
