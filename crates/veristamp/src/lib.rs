//! # Veristamp
//!
//! Content-authenticity verdicts on a tamper-resistant ledger: submit a
//! content fingerprint plus a verdict, retrieve it later by fingerprint.
//!
//! ## Overview
//!
//! - **Records**: Immutable. One per digest, forever. No update, no delete.
//! - **Connection**: One explicit [`VerificationService`] owns the signing
//!   context; external account/chain changes flow through it.
//! - **Submissions**: Estimated, signed externally, awaited to first
//!   inclusion; every failure surfaces once, typed.
//! - **Mock**: The same surface backed by an in-memory simulation,
//!   switchable at runtime for development and tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use veristamp::{VerificationService, InterfaceSpec};
//! use veristamp::client::endpoint::embedded::EmbeddedEndpoint;
//! use veristamp::client::provider::memory::MemoryWalletProvider;
//! use veristamp::{AccountId, ChainKey, ContentDigest};
//! use veristamp::ledger::RecordLedger;
//!
//! async fn example() {
//!     let chain = ChainKey::new(1);
//!     let endpoint = Arc::new(EmbeddedEndpoint::new(Arc::new(RecordLedger::new()), chain));
//!     let address = endpoint.store_address();
//!     let provider = Arc::new(MemoryWalletProvider::new(
//!         vec![AccountId::from_bytes([0x01; 20])],
//!         chain,
//!     ));
//!
//!     let service = VerificationService::live(Some(provider), endpoint);
//!     service.connect().await.unwrap();
//!     service.bind(InterfaceSpec::record_store(), address).await.unwrap();
//!
//!     let digest = ContentDigest::of(b"press photo");
//!     let receipt = service.submit(digest, true, 92).await.unwrap();
//!     println!("included in block {}", receipt.block_number);
//!
//!     let record = service.lookup(digest).await.unwrap();
//!     assert!(record.is_some());
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `veristamp::core` - Core primitives (digests, records, validation)
//! - `veristamp::ledger` - The ledger-resident record store
//! - `veristamp::client` - Connection, binding, and lifecycle machinery

pub mod service;

// Re-export component crates
pub use veristamp_client as client;
pub use veristamp_core as core;
pub use veristamp_ledger as ledger;

// Re-export main types for convenience
pub use service::VerificationService;

pub use veristamp_client::{
    BindingHandle, ChainError, ChainService, ConnectionEvent, ConnectionState,
    InterfaceSpec, LiveChain, MockChain, MockOptions, RetryAdvice, SubmitReceipt,
};
pub use veristamp_core::{
    AccountId, ChainKey, ClassifierVerdict, ContentDigest, ContractAddress, CostEstimate,
    PendingTransaction, TxHash, TxStatus, ValidationError, VerificationRecord,
};
pub use veristamp_ledger::{RecordLedger, RecordStored};
