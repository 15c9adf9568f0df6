//! The client error taxonomy.
//!
//! Every failure surfaces exactly once, as one of these variants, carrying
//! enough raw context (provider code, revert reason) for actionable
//! display. Nothing is retried automatically; [`RetryAdvice`] tells the
//! caller what a sensible next step is.

use thiserror::Error;

use veristamp_core::{ChainKey, ContentDigest, ValidationError};

/// Errors surfaced by the client service surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Submission arguments failed local validation; no external call was
    /// made.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No external signing provider is present.
    #[error("wallet provider unavailable")]
    WalletUnavailable,

    /// The provider yielded an empty account list.
    #[error("wallet has no accounts")]
    NoAccounts,

    /// Operation requires an active signing context.
    #[error("not connected")]
    NotConnected,

    /// Operation requires a bound store reference.
    #[error("no contract binding")]
    BindingMissing,

    /// The user declined to sign.
    #[error("user rejected the request (code {code}): {message}")]
    UserRejected { code: i64, message: String },

    /// The caller's balance cannot cover the write.
    #[error("insufficient funds: {message}")]
    InsufficientFunds { message: String },

    /// The signing context is on an unexpected chain.
    #[error("wrong network: expected {expected}, got {actual}")]
    WrongNetwork {
        expected: ChainKey,
        actual: ChainKey,
    },

    /// Inclusion is delayed beyond the network's patience.
    #[error("network congestion: {message}")]
    Congestion { message: String },

    /// A record already exists for this digest. Terminal for the digest.
    #[error("record already exists for digest {digest}")]
    DuplicateRecord { digest: ContentDigest },

    /// Unclassified failure; raw diagnostics preserved.
    #[error("unclassified chain error (code {code:?}): {message}")]
    Unknown { code: Option<i64>, message: String },
}

/// What a caller can usefully do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAdvice {
    /// Fix the submission arguments; retrying as-is will fail again.
    FixInput,
    /// Connect (or reconnect) first.
    AfterConnect,
    /// Bind the store reference first.
    AfterBind,
    /// A fresh submission may succeed as-is.
    Resubmit,
    /// Fund the account first.
    AfterFunding,
    /// Switch to the expected network first.
    AfterNetworkSwitch,
    /// Terminal for these arguments; do not retry.
    Terminal,
    /// Not classifiable; the caller decides.
    CallerDiscretion,
}

impl ChainError {
    /// Classify this error per the retriability table.
    pub fn retry_advice(&self) -> RetryAdvice {
        match self {
            ChainError::Validation(_) => RetryAdvice::FixInput,
            ChainError::WalletUnavailable
            | ChainError::NoAccounts
            | ChainError::NotConnected => RetryAdvice::AfterConnect,
            ChainError::BindingMissing => RetryAdvice::AfterBind,
            ChainError::UserRejected { .. } => RetryAdvice::Resubmit,
            ChainError::InsufficientFunds { .. } => RetryAdvice::AfterFunding,
            ChainError::WrongNetwork { .. } => RetryAdvice::AfterNetworkSwitch,
            ChainError::Congestion { .. } => RetryAdvice::Resubmit,
            ChainError::DuplicateRecord { .. } => RetryAdvice::Terminal,
            ChainError::Unknown { .. } => RetryAdvice::CallerDiscretion,
        }
    }

    /// Whether any retry path exists at all.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self.retry_advice(),
            RetryAdvice::FixInput | RetryAdvice::Terminal
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_advice_table() {
        let digest = ContentDigest::from_bytes([1; 32]);
        let cases = [
            (
                ChainError::Validation(ValidationError::EmptyDigest),
                RetryAdvice::FixInput,
            ),
            (ChainError::WalletUnavailable, RetryAdvice::AfterConnect),
            (ChainError::NoAccounts, RetryAdvice::AfterConnect),
            (ChainError::NotConnected, RetryAdvice::AfterConnect),
            (ChainError::BindingMissing, RetryAdvice::AfterBind),
            (
                ChainError::UserRejected {
                    code: 4001,
                    message: "denied".into(),
                },
                RetryAdvice::Resubmit,
            ),
            (
                ChainError::InsufficientFunds {
                    message: "balance 0".into(),
                },
                RetryAdvice::AfterFunding,
            ),
            (
                ChainError::WrongNetwork {
                    expected: ChainKey::new(1),
                    actual: ChainKey::new(5),
                },
                RetryAdvice::AfterNetworkSwitch,
            ),
            (
                ChainError::Congestion {
                    message: "mempool full".into(),
                },
                RetryAdvice::Resubmit,
            ),
            (
                ChainError::DuplicateRecord { digest },
                RetryAdvice::Terminal,
            ),
            (
                ChainError::Unknown {
                    code: None,
                    message: "??".into(),
                },
                RetryAdvice::CallerDiscretion,
            ),
        ];

        for (err, advice) in cases {
            assert_eq!(err.retry_advice(), advice, "for {err:?}");
        }
    }

    #[test]
    fn test_terminal_errors_not_retriable() {
        let digest = ContentDigest::from_bytes([1; 32]);
        assert!(!ChainError::DuplicateRecord { digest }.is_retriable());
        assert!(!ChainError::Validation(ValidationError::EmptyDigest).is_retriable());
        assert!(ChainError::NotConnected.is_retriable());
    }
}
