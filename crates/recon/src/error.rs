use std::fmt;

use hermes_core::{RowError, StoreError, ValidationError};

/// Failure that aborts a whole operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Store rejected the batch write; nothing was changed.
    Store(StoreError),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "restore aborted: {e}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<StoreError> for ReconError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Failure for a single candidate. Counted, never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateError {
    /// Source row could not be read.
    Row(RowError),
    Validation(ValidationError),
    Store(StoreError),
}

impl fmt::Display for CandidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(e) => write!(f, "malformed row: {}", e.message),
            Self::Validation(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CandidateError {}

impl From<ValidationError> for CandidateError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for CandidateError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
