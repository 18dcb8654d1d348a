//! # DomainError
//!
//! The closed error taxonomy for the suggestion engine. Callers branch on
//! the variant (or the stable `code()` string over the wire), never on
//! message text.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{ModerationAction, SuggestionStatus};

/// Every failure the engine or its orchestration can produce.
#[derive(Error, Debug)]
pub enum DomainError {
    /// A required field is missing or empty at creation.
    #[error("{0} is required")]
    InvalidInput(&'static str),

    /// Star value outside the configured rating range.
    #[error("rating {value} is outside the accepted range {min}..={max}")]
    InvalidRating { value: i32, min: i32, max: i32 },

    /// The supplied id does not parse into a suggestion id.
    #[error("invalid suggestion id: {0}")]
    InvalidId(String),

    /// Referenced suggestion does not exist.
    #[error("suggestion {0} not found")]
    NotFound(Uuid),

    /// Reject was requested without a reason.
    #[error("a reason is required to reject a suggestion")]
    MissingReason,

    /// Strict transition mode refused a moderation action.
    #[error("cannot {action} a suggestion that is already {from}")]
    InvalidTransition {
        from: SuggestionStatus,
        action: ModerationAction,
    },

    /// The principal lacks the role or user type the operation requires.
    #[error("not permitted: {0}")]
    Unauthorized(&'static str),

    /// The underlying store failed. Detail goes to logs, not to callers.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl DomainError {
    /// Stable machine-readable code for clients to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidInput(_) => "INVALID_INPUT",
            DomainError::InvalidRating { .. } => "INVALID_RATING",
            DomainError::InvalidId(_) => "INVALID_ID",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::MissingReason => "MISSING_REASON",
            DomainError::InvalidTransition { .. } => "INVALID_TRANSITION",
            DomainError::Unauthorized(_) => "NOT_PERMITTED",
            DomainError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Client errors are the caller's fault and must not be retried as-is.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DomainError::StoreUnavailable(_))
    }
}

/// A specialized Result type for suggestion-engine operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DomainError::MissingReason.code(), "MISSING_REASON");
        assert_eq!(DomainError::Unauthorized("x").code(), "NOT_PERMITTED");
        assert_eq!(
            DomainError::StoreUnavailable("down".into()).code(),
            "STORE_UNAVAILABLE"
        );
    }

    #[test]
    fn only_store_failures_are_server_errors() {
        assert!(DomainError::NotFound(Uuid::nil()).is_client_error());
        assert!(!DomainError::StoreUnavailable("down".into()).is_client_error());
    }
}
