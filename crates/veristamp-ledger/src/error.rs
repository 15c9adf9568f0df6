//! Error types for the ledger record store.

use thiserror::Error;

use veristamp_core::{ContentDigest, ValidationError};

/// Stable revert reason surfaced through the execution layer for a
/// duplicate store attempt.
pub const REASON_DUPLICATE: &str = "record already exists";

/// Stable revert reason for a zero digest.
pub const REASON_EMPTY_DIGEST: &str = "empty content digest";

/// Stable revert reason for out-of-range confidence.
pub const REASON_CONFIDENCE_RANGE: &str = "confidence out of range";

/// Errors that can occur during ledger operations.
///
/// Every failure leaves ledger state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Submission arguments failed the field constraints.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A record already exists for this digest. Terminal for the digest:
    /// records are immutable and never replaced.
    #[error("record already exists: {digest}")]
    DuplicateRecord { digest: ContentDigest },
}

impl LedgerError {
    /// The machine-readable reason string an execution layer would carry
    /// in its revert payload.
    pub fn revert_reason(&self) -> &'static str {
        match self {
            LedgerError::Validation(ValidationError::EmptyDigest) => REASON_EMPTY_DIGEST,
            LedgerError::Validation(ValidationError::ConfidenceOutOfRange { .. }) => {
                REASON_CONFIDENCE_RANGE
            }
            LedgerError::DuplicateRecord { .. } => REASON_DUPLICATE,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
