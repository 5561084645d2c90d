//! Error types for reviewledger.
//!
//! All errors are strongly typed using thiserror so callers can pattern
//! match on the exact condition (a rejected score versus a failed write
//! versus a corrupt blob) instead of parsing messages.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised before any ledger mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Score '{input}' is not a number between 1 and 10")]
    InvalidScore {
        input: String,
    },

    #[error("Review text cannot be empty")]
    EmptyReview,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },
}

impl ValidationError {
    pub(crate) fn invalid_score(input: impl Into<String>) -> Self {
        Self::InvalidScore {
            input: input.into(),
        }
    }
}

/// Top-level error type for reviewledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The stored blob exists but cannot be turned back into a valid ledger.
    #[error("Stored ledger is corrupt: {reason}")]
    Corrupt {
        reason: String,
    },
}

impl LedgerError {
    /// Creates a corruption error.
    #[must_use]
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if the stored data was present but unusable.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false, // Same input, same rejection
            Self::Storage(e) => e.is_retryable(),
            Self::Corrupt { .. } => false,
        }
    }
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
