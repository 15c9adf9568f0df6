//! Error types for the Veristamp core.

use thiserror::Error;

/// Validation errors for submissions, checked locally before any network
/// round-trip and again by the ledger itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The content digest is the zero sentinel.
    #[error("empty content digest")]
    EmptyDigest,

    /// Confidence exceeds the 0..=100 range.
    #[error("confidence out of range: {got} (max 100)")]
    ConfidenceOutOfRange { got: u8 },
}
