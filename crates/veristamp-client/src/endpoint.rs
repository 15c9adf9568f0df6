//! Ledger endpoint abstraction.
//!
//! The endpoint is the node the client talks to: it accepts encoded calls,
//! reports costs, tracks inclusion, and serves reads. Call data is decoded
//! exactly once, behind this boundary; everything in front of it works
//! with typed values.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use veristamp_core::{
    AccountId, ChainKey, ContentDigest, ContractAddress, TxHash, VerificationRecord,
};

/// Errors raised by a ledger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Execution reverted; `reason` is the ledger's machine-readable
    /// reason string.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    /// The submitting account cannot cover the write.
    #[error("insufficient funds: {message}")]
    InsufficientFunds { message: String },

    /// The network would not accept the submission in time.
    #[error("congested: {message}")]
    Congested { message: String },

    /// No transaction known under this hash.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(TxHash),

    /// Transport-level failure talking to the node.
    #[error("endpoint transport error: {0}")]
    Transport(String),
}

/// Result type for endpoint operations.
pub type Result<T> = std::result::Result<T, EndpointError>;

/// Proof of inclusion for a submitted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusionReceipt {
    /// The submission reference.
    pub tx_hash: TxHash,

    /// Block of inclusion.
    pub block_number: u64,

    /// Execution units consumed.
    pub units_consumed: u64,
}

/// A ledger node, seen from the client.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LedgerEndpoint: Send + Sync {
    /// The chain this endpoint serves.
    async fn chain_key(&self) -> Result<ChainKey>;

    /// Current network price per execution unit.
    async fn unit_price(&self) -> Result<u128>;

    /// Estimate execution units for a call by simulating it.
    ///
    /// A call that would revert fails the estimate with the same reason.
    async fn estimate_units(&self, address: ContractAddress, call: &Bytes) -> Result<u64>;

    /// Submit a call for inclusion. Returns the pending-transaction
    /// reference; once sent, the submission cannot be revoked.
    async fn submit(&self, address: ContractAddress, call: Bytes, from: AccountId)
        -> Result<TxHash>;

    /// Await first inclusion of a submitted call.
    ///
    /// Resolves when the write is durably recorded, or fails with the
    /// rejection. No internal timeout; callers impose their own.
    async fn await_inclusion(&self, hash: TxHash) -> Result<InclusionReceipt>;

    /// Confirmation count past first inclusion. Advisory display only,
    /// never a correctness mechanism.
    async fn confirmations(&self, hash: TxHash) -> Result<u64>;

    /// Read a record from the deployed store.
    async fn query_record(
        &self,
        address: ContractAddress,
        digest: ContentDigest,
    ) -> Result<VerificationRecord>;
}

/// An in-process node over a [`veristamp_ledger::RecordLedger`], with
/// simulated inclusion latency.
pub mod embedded {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tracing::debug;
    use veristamp_ledger::RecordLedger;

    use crate::binding::StoreCall;

    /// Intrinsic units for any submission.
    const BASE_UNITS: u64 = 21_000;

    /// Units for the record write itself.
    const STORE_UNITS: u64 = 45_000;

    /// Default price per unit.
    const DEFAULT_UNIT_PRICE: u128 = 30;

    /// Default simulated inclusion latency.
    const DEFAULT_LATENCY: Duration = Duration::from_millis(25);

    /// In-process ledger endpoint.
    ///
    /// Executes submissions against the ledger at submit time (the ledger
    /// serializes them), stashes each outcome under a deterministic tx
    /// hash, and replays it at `await_inclusion` after the simulated
    /// latency.
    pub struct EmbeddedEndpoint {
        ledger: Arc<RecordLedger>,
        chain: ChainKey,
        store_address: ContractAddress,
        unit_price: u128,
        latency: Duration,
        nonce: AtomicU64,
        outcomes: Mutex<HashMap<TxHash, StashedOutcome>>,
        included: Mutex<HashMap<TxHash, u64>>,
    }

    type StashedOutcome = std::result::Result<InclusionReceipt, String>;

    impl EmbeddedEndpoint {
        /// Wrap a ledger as an endpoint on the given chain.
        pub fn new(ledger: Arc<RecordLedger>, chain: ChainKey) -> Self {
            let store_address = Self::derive_store_address(chain);
            Self {
                ledger,
                chain,
                store_address,
                unit_price: DEFAULT_UNIT_PRICE,
                latency: DEFAULT_LATENCY,
                nonce: AtomicU64::new(0),
                outcomes: Mutex::new(HashMap::new()),
                included: Mutex::new(HashMap::new()),
            }
        }

        /// Override the simulated inclusion latency.
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        /// The deployed store address on this endpoint.
        pub fn store_address(&self) -> ContractAddress {
            self.store_address
        }

        /// The underlying ledger.
        pub fn ledger(&self) -> &Arc<RecordLedger> {
            &self.ledger
        }

        fn derive_store_address(chain: ChainKey) -> ContractAddress {
            let mut hasher = blake3::Hasher::new();
            hasher.update(b"veristamp-deploy-v0:");
            hasher.update(&chain.as_u64().to_be_bytes());
            let hash = hasher.finalize();
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&hash.as_bytes()[..20]);
            ContractAddress::from_bytes(addr)
        }

        fn check_address(&self, address: ContractAddress) -> Result<()> {
            if address != self.store_address {
                return Err(EndpointError::Transport(format!(
                    "no contract deployed at {address}"
                )));
            }
            Ok(())
        }

        fn decode_call(call: &[u8]) -> Result<StoreCall> {
            StoreCall::decode(call)
                .ok_or_else(|| EndpointError::Transport("malformed call data".into()))
        }

        fn next_tx_hash(&self, from: AccountId, call: &[u8]) -> TxHash {
            let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
            let mut hasher = blake3::Hasher::new();
            hasher.update(b"veristamp-tx-v0:");
            hasher.update(from.as_bytes());
            hasher.update(call);
            hasher.update(&nonce.to_be_bytes());
            TxHash::from_bytes(*hasher.finalize().as_bytes())
        }
    }

    #[async_trait]
    impl LedgerEndpoint for EmbeddedEndpoint {
        async fn chain_key(&self) -> Result<ChainKey> {
            Ok(self.chain)
        }

        async fn unit_price(&self) -> Result<u128> {
            Ok(self.unit_price)
        }

        async fn estimate_units(
            &self,
            address: ContractAddress,
            call: &Bytes,
        ) -> Result<u64> {
            self.check_address(address)?;
            let call = Self::decode_call(call)?;

            // Simulate: a call that would revert fails the estimate
            veristamp_core::validate_submission(&call.digest, call.confidence).map_err(
                |e| EndpointError::Reverted {
                    reason: veristamp_ledger::LedgerError::Validation(e)
                        .revert_reason()
                        .to_string(),
                },
            )?;
            if self.ledger.record_exists(&call.digest) {
                return Err(EndpointError::Reverted {
                    reason: veristamp_ledger::error::REASON_DUPLICATE.to_string(),
                });
            }

            Ok(BASE_UNITS + STORE_UNITS)
        }

        async fn submit(
            &self,
            address: ContractAddress,
            call: Bytes,
            from: AccountId,
        ) -> Result<TxHash> {
            self.check_address(address)?;
            let decoded = Self::decode_call(&call)?;
            let hash = self.next_tx_hash(from, &call);

            // Execute now, under ledger serialization; the caller observes
            // the outcome only at await_inclusion.
            let outcome = match self.ledger.store_record(
                from,
                decoded.digest,
                decoded.is_authentic,
                decoded.confidence,
            ) {
                Ok(result) => {
                    self.included
                        .lock()
                        .expect("included lock poisoned")
                        .insert(hash, result.block_number);
                    Ok(InclusionReceipt {
                        tx_hash: hash,
                        block_number: result.block_number,
                        units_consumed: BASE_UNITS + STORE_UNITS,
                    })
                }
                Err(err) => Err(err.revert_reason().to_string()),
            };

            debug!(%hash, %from, "submission accepted");
            self.outcomes
                .lock()
                .expect("outcomes lock poisoned")
                .insert(hash, outcome);
            Ok(hash)
        }

        async fn await_inclusion(&self, hash: TxHash) -> Result<InclusionReceipt> {
            tokio::time::sleep(self.latency).await;

            let outcome = self
                .outcomes
                .lock()
                .expect("outcomes lock poisoned")
                .remove(&hash)
                .ok_or(EndpointError::UnknownTransaction(hash))?;

            outcome.map_err(|reason| EndpointError::Reverted { reason })
        }

        async fn confirmations(&self, hash: TxHash) -> Result<u64> {
            let included_at = self
                .included
                .lock()
                .expect("included lock poisoned")
                .get(&hash)
                .copied()
                .ok_or(EndpointError::UnknownTransaction(hash))?;

            Ok(self.ledger.height().saturating_sub(included_at) + 1)
        }

        async fn query_record(
            &self,
            address: ContractAddress,
            digest: ContentDigest,
        ) -> Result<VerificationRecord> {
            self.check_address(address)?;
            Ok(self.ledger.get_record(&digest))
        }
    }

}
