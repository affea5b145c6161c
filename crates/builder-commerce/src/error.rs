//! Commerce error types.

use thiserror::Error;

/// Errors raised while turning wire payloads into domain types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommerceError {
    /// Item payload is missing an identity field.
    #[error("Item missing required field: {0}")]
    MissingField(&'static str),

    /// Item price is present but not numeric.
    #[error("Invalid item price: {0}")]
    InvalidPrice(String),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}
