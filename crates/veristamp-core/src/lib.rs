//! # Veristamp Core
//!
//! Pure primitives for the Veristamp verification ledger: content digests,
//! identities, verification records, and submission validation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over strongly-typed data.
//!
//! ## Key Types
//!
//! - [`ContentDigest`] - Fixed-length fingerprint of content, the unique record key
//! - [`VerificationRecord`] - An authenticity verdict as stored on the ledger
//! - [`AccountId`] / [`ContractAddress`] - Signing identity and deployed store address
//! - [`PendingTransaction`] - Ephemeral lifecycle state of a submitted write

pub mod error;
pub mod record;
pub mod tx;
pub mod types;

pub use error::ValidationError;
pub use record::{
    validate_submission, ClassifierVerdict, VerificationRecord, MAX_CONFIDENCE,
};
pub use tx::{CostEstimate, PendingTransaction, TxStatus};
pub use types::{AccountId, ChainKey, ContentDigest, ContractAddress, TxHash};
