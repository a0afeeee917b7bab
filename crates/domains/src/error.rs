//! # DomainError
//!
//! Centralized error handling for the Courtside ecosystem.
//! Every port and service returns this type; the API layer maps each variant
//! to an HTTP status.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Venue, Court, Booking)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed or out-of-range input (e.g., rating 7, booking in the past)
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, expired or otherwise unverifiable access token
    #[error("unauthenticated: {0}")]
    Authentication(String),

    /// Authenticated, but the role or ownership does not permit the operation
    #[error("forbidden: {0}")]
    Authorization(String),

    /// Illegal state transition or overlapping booking
    #[error("conflict: {0}")]
    Conflict(String),

    /// Identity provider or storage provider failure
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    /// Upstream failures may succeed on a later attempt; nothing else should
    /// be retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

/// A specialized Result type for Courtside domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = DomainError::not_found("Venue", "abc");
        assert_eq!(err.to_string(), "Venue not found with ID abc");
    }

    #[test]
    fn only_upstream_is_retryable() {
        assert!(DomainError::Upstream("timeout".into()).is_retryable());
        assert!(!DomainError::Conflict("slot taken".into()).is_retryable());
        assert!(!DomainError::Internal("db".into()).is_retryable());
    }
}
