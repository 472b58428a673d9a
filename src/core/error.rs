use crate::core::NodeValue;
use thiserror::Error;

/// Errors that stop a batch: bad configuration caught before anything is
/// dispatched, or a broken completion protocol while it runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("`over` must resolve to an array, got {0}")]
    OverNotArray(String),

    #[error("`over` key `{0}` was not found in the shared state")]
    MissingOver(String),

    #[error("no `over` source configured")]
    NoOverSource,

    #[error("no invocation configured for this map")]
    MissingInvocation,

    #[error("no invocation registered under name `{0}`")]
    UnknownInvocation(String),

    #[error("`par` must be a non-negative integer, got {0}")]
    InvalidConcurrency(String),

    #[error("invalid param `{name}`: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("argument builder must return an array for position {position}, got {got}")]
    InvalidArguments { position: usize, got: String },

    // Protocol violations
    #[error("outcome delivered twice for position {0}")]
    DuplicateOutcome(usize),

    #[error("position {position} is out of range for a batch of {total}")]
    PositionOutOfRange { position: usize, total: usize },

    #[error("position {0} completed but was never in flight")]
    NotInFlight(usize),

    #[error("completion recorded after the batch already completed")]
    AlreadyComplete,

    #[error("outcome channel closed with {remaining} invocation(s) outstanding")]
    ChannelClosed { remaining: usize },
}

impl MapError {
    /// True for internal-consistency failures, false for configuration errors.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            MapError::DuplicateOutcome(_)
                | MapError::PositionOutOfRange { .. }
                | MapError::NotInFlight(_)
                | MapError::AlreadyComplete
                | MapError::ChannelClosed { .. }
        )
    }
}

/// A failure reported by a single invocation. Collected into the error
/// sequence, never propagated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ItemError {
    #[error("invocation failed: {0}")]
    Failed(String),

    #[error("invocation rejected: {reason}")]
    Rejected { reason: String, detail: NodeValue },

    #[error("invocation panicked: {0}")]
    Panicked(String),
}

impl ItemError {
    pub fn failed(msg: impl Into<String>) -> Self {
        ItemError::Failed(msg.into())
    }

    pub fn rejected(reason: impl Into<String>, detail: NodeValue) -> Self {
        ItemError::Rejected {
            reason: reason.into(),
            detail,
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_protocol_violation_classification() {
        assert!(MapError::DuplicateOutcome(1).is_protocol_violation());
        assert!(MapError::AlreadyComplete.is_protocol_violation());
        assert!(MapError::ChannelClosed { remaining: 2 }.is_protocol_violation());
        assert!(!MapError::OverNotArray("\"x\"".into()).is_protocol_violation());
        assert!(!MapError::MissingInvocation.is_protocol_violation());
    }

    #[test]
    fn test_item_error_display() {
        assert_eq!(
            ItemError::failed("boom").to_string(),
            "invocation failed: boom"
        );
        let rejected = ItemError::rejected("too large", json!({"limit": 10}));
        assert_eq!(rejected.to_string(), "invocation rejected: too large");
    }
}
