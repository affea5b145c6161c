//! Engine error types.

use builder_commerce::{CategoryKey, CommerceError, ItemId};
use builder_data::FetchError;
use thiserror::Error;

/// Everything the engine can report to the presentation layer.
///
/// None of these are fatal: the engine stays consistent and every
/// operation can be invoked again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Category fetch rejected or answered non-2xx.
    #[error("Failed to fetch {key}: {source}")]
    NetworkFailure { key: CategoryKey, source: FetchError },

    /// Submission attempted with no order lines.
    #[error("Please pick at least one component.")]
    NothingSelected,

    /// Some, not all, individual cart adds failed.
    #[error("{failed} item(s) could not be added.")]
    PartialSubmissionFailure { failed: usize, total: usize },

    /// Batch and individual stages exhausted and the fallback could not be issued.
    #[error("Could not add the build to the cart: {0}")]
    TotalSubmissionFailure(String),

    /// Item payload lacks identity fields or carries a malformed price.
    #[error("Invalid item: {0}")]
    InvalidItem(#[from] CommerceError),

    /// Out-of-stock items cannot be selected.
    #[error("Item {0} is out of stock")]
    OutOfStock(ItemId),

    /// A cart submission is already running.
    #[error("A cart submission is already in progress")]
    Busy,
}

impl EngineError {
    /// Conditions the user may retry by invoking the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::NetworkFailure { .. }
                | EngineError::PartialSubmissionFailure { .. }
                | EngineError::TotalSubmissionFailure(_)
                | EngineError::Busy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_message() {
        let err = EngineError::PartialSubmissionFailure { failed: 2, total: 5 };
        assert_eq!(err.to_string(), "2 item(s) could not be added.");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_item_is_not_retryable() {
        let err: EngineError = CommerceError::MissingField("id").into();
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Invalid item: Item missing required field: id");
    }
}
