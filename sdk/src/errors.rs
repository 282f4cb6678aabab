//! Error types and handling
//!
//! This module provides the error taxonomy used throughout Pinboard.
//! All errors implement the `BoardErrorExt` trait which provides user-friendly
//! hints and tells the boundary whether the caller or the infrastructure is at fault.
//!
//! # Propagation
//!
//! - `Validation` and `NotFound` are request-scoped and reported to the caller.
//! - `StorageUnavailable` and `ChannelWrite` are recovered locally (fallback data,
//!   subscriber isolation) and only ever show up in logs and diagnostics.

use thiserror::Error;

/// Trait for board error extensions
pub trait BoardErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string and never echoes request data.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are handled locally or can be fixed by the caller
    /// resending a corrected request.
    fn is_recoverable(&self) -> bool;

    /// Returns whether the caller caused the error
    fn is_client_error(&self) -> bool;
}

/// Main board error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{BoardError, BoardErrorExt};
///
/// let error = BoardError::NotFound("ghost".to_string());
/// assert!(error.is_client_error());
/// assert!(!error.user_hint().is_empty());
///
/// let outage = BoardError::StorageUnavailable("connection refused".to_string());
/// assert!(!outage.is_client_error());
/// assert!(outage.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum BoardError {
    // Client errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Channel write failed: {0}")]
    ChannelWrite(String),

    // Ambient errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BoardError {
    /// Shorthand for building a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl BoardErrorExt for BoardError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Validation(_) => "Check the request fields and try again",
            Self::NotFound(_) => "The item does not exist. Refresh the board and retry",
            Self::StorageUnavailable(_) => "Board storage is unreachable. Changes are kept live only",
            Self::ChannelWrite(_) => "A live viewer disconnected",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Serialization(_) => "Stored board data could not be decoded",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct_from_validation() {
        let missing = BoardError::NotFound("ghost".to_string());
        let invalid = BoardError::validation("kind is required");

        assert!(matches!(missing, BoardError::NotFound(_)));
        assert!(matches!(invalid, BoardError::Validation(_)));
        assert_ne!(missing.user_hint(), invalid.user_hint());
    }

    #[test]
    fn test_client_errors() {
        assert!(BoardError::validation("x").is_client_error());
        assert!(BoardError::NotFound("x".into()).is_client_error());
        assert!(!BoardError::StorageUnavailable("x".into()).is_client_error());
        assert!(!BoardError::ChannelWrite("x".into()).is_client_error());
    }

    #[test]
    fn test_config_is_not_recoverable() {
        assert!(!BoardError::Config("bad".into()).is_recoverable());
        assert!(BoardError::StorageUnavailable("down".into()).is_recoverable());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: BoardError = serde_json::from_str::<Vec<u8>>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, BoardError::Serialization(_)));
    }
}
