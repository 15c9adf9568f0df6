//! Transaction lifecycle: estimate, submit, await inclusion, classify.
//!
//! One outstanding inclusion wait per submit call. Nothing is retried
//! automatically, and there is no internal timeout: the latency of
//! `submit` is dominated by ledger consensus and the caller imposes its
//! own patience. A submission, once sent, cannot be revoked, only
//! abandoned; an abandoned transaction still resolves on the ledger under
//! the context it was signed with.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use veristamp_core::{
    validate_submission, ContentDigest, CostEstimate, PendingTransaction, TxHash,
};
use veristamp_ledger::error::REASON_DUPLICATE;

use crate::binding::{BindingHandle, StoreCall};
use crate::connection::classify_provider_error;
use crate::endpoint::{EndpointError, LedgerEndpoint};
use crate::error::{ChainError, Result};
use crate::provider::WalletProvider;

/// Outcome of a confirmed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// The submission reference.
    pub tx_hash: TxHash,

    /// Block of first inclusion.
    pub block_number: u64,

    /// Execution units consumed.
    pub units_consumed: u64,
}

/// Drives write submissions through a binding to a terminal outcome.
pub struct TxLifecycle {
    endpoint: Arc<dyn LedgerEndpoint>,
    signer: Option<Arc<dyn WalletProvider>>,
    in_flight: Mutex<HashMap<TxHash, PendingTransaction>>,
}

impl TxLifecycle {
    /// Create a controller over the given endpoint.
    pub fn new(endpoint: Arc<dyn LedgerEndpoint>) -> Self {
        Self {
            endpoint,
            signer: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Route submissions through a signing provider for user approval.
    pub fn with_signer(mut self, signer: Arc<dyn WalletProvider>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Estimate the cost of a store operation.
    ///
    /// `BindingMissing` when unbound, local validation next; the estimate
    /// itself queries the endpoint for units and unit price.
    pub async fn estimate(
        &self,
        binding: Option<&BindingHandle>,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<CostEstimate> {
        let binding = binding.ok_or(ChainError::BindingMissing)?;
        validate_submission(&digest, confidence)?;
        self.check_network(binding).await?;

        let call = binding.encode_store(&StoreCall {
            digest,
            is_authentic,
            confidence,
        });

        let units = self
            .endpoint
            .estimate_units(binding.address(), &call)
            .await
            .map_err(|e| classify_endpoint_error(e, digest))?;
        let price = self
            .endpoint
            .unit_price()
            .await
            .map_err(|e| classify_endpoint_error(e, digest))?;

        Ok(CostEstimate::new(units, price))
    }

    /// Submit a store operation and await its first inclusion.
    ///
    /// Steps: `BindingMissing` when unbound; local cheap rejection before
    /// any external call; user approval through the signing provider;
    /// submission through the binding; one inclusion wait. The first
    /// inclusion event is the authoritative result.
    pub async fn submit(
        &self,
        binding: Option<&BindingHandle>,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<SubmitReceipt> {
        let binding = binding.ok_or(ChainError::BindingMissing)?;
        // Cheap local rejection before any external call
        validate_submission(&digest, confidence)?;
        self.check_network(binding).await?;

        let signer_account = binding.signer().account;
        let call = binding.encode_store(&StoreCall {
            digest,
            is_authentic,
            confidence,
        });

        if let Some(signer) = &self.signer {
            signer
                .approve_submission(signer_account, &call)
                .await
                .map_err(classify_provider_error)?;
        }

        let hash = self
            .endpoint
            .submit(binding.address(), call, signer_account)
            .await
            .map_err(|e| classify_endpoint_error(e, digest))?;

        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .insert(hash, PendingTransaction::new(hash));
        debug!(%hash, %digest, "submission pending");

        match self.endpoint.await_inclusion(hash).await {
            Ok(receipt) => {
                self.with_pending(hash, |tx| {
                    tx.confirm(receipt.block_number, receipt.units_consumed)
                });
                info!(%hash, block = receipt.block_number, "submission confirmed");
                Ok(SubmitReceipt {
                    tx_hash: receipt.tx_hash,
                    block_number: receipt.block_number,
                    units_consumed: receipt.units_consumed,
                })
            }
            Err(err) => {
                self.with_pending(hash, |tx| tx.fail());
                debug!(%hash, %err, "submission failed");
                Err(classify_endpoint_error(err, digest))
            }
        }
    }

    /// Confirmation count past first inclusion. Advisory display only;
    /// the authoritative result is the inclusion event from `submit`.
    pub async fn confirmations(&self, hash: TxHash) -> Result<u64> {
        self.endpoint
            .confirmations(hash)
            .await
            .map_err(|e| classify_endpoint_error(e, ContentDigest::ZERO))
    }

    /// Snapshot of transactions submitted through this controller.
    pub fn pending(&self) -> Vec<PendingTransaction> {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// The binding's signing context must match the endpoint's chain.
    async fn check_network(&self, binding: &BindingHandle) -> Result<()> {
        let endpoint_chain = self
            .endpoint
            .chain_key()
            .await
            .map_err(|e| classify_endpoint_error(e, ContentDigest::ZERO))?;
        let signer_chain = binding.signer().chain;
        if endpoint_chain != signer_chain {
            return Err(ChainError::WrongNetwork {
                expected: endpoint_chain,
                actual: signer_chain,
            });
        }
        Ok(())
    }

    fn with_pending(&self, hash: TxHash, f: impl FnOnce(&mut PendingTransaction)) {
        let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
        if let Some(tx) = in_flight.get_mut(&hash) {
            f(tx);
        }
    }
}

/// Map an endpoint failure into the client taxonomy.
///
/// The ledger's duplicate rejection travels as a revert reason; everything
/// unclassifiable keeps its raw diagnostics.
fn classify_endpoint_error(err: EndpointError, digest: ContentDigest) -> ChainError {
    match err {
        EndpointError::Reverted { reason } if reason == REASON_DUPLICATE => {
            ChainError::DuplicateRecord { digest }
        }
        EndpointError::Reverted { reason } => ChainError::Unknown {
            code: None,
            message: format!("execution reverted: {reason}"),
        },
        EndpointError::InsufficientFunds { message } => {
            ChainError::InsufficientFunds { message }
        }
        EndpointError::Congested { message } => ChainError::Congestion { message },
        EndpointError::UnknownTransaction(hash) => ChainError::Unknown {
            code: None,
            message: format!("unknown transaction {hash}"),
        },
        EndpointError::Transport(message) => ChainError::Unknown {
            code: None,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{InterfaceSpec, SigningContext};
    use crate::endpoint::embedded::EmbeddedEndpoint;
    use crate::provider::memory::MemoryWalletProvider;
    use crate::provider::CODE_USER_REJECTED;
    use std::time::Duration;
    use veristamp_core::{AccountId, ChainKey, TxStatus, ValidationError};
    use veristamp_ledger::RecordLedger;

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 20])
    }

    fn harness() -> (TxLifecycle, BindingHandle, Arc<MemoryWalletProvider>) {
        let chain = ChainKey::new(1);
        let endpoint = Arc::new(
            EmbeddedEndpoint::new(Arc::new(RecordLedger::new()), chain)
                .with_latency(Duration::from_millis(1)),
        );
        let provider = Arc::new(MemoryWalletProvider::new(vec![account(1)], chain));
        let binding = BindingHandle::derive(
            InterfaceSpec::record_store(),
            endpoint.store_address(),
            SigningContext {
                account: account(1),
                chain,
            },
        );
        let lifecycle = TxLifecycle::new(endpoint).with_signer(provider.clone());
        (lifecycle, binding, provider)
    }

    #[tokio::test]
    async fn test_submit_without_binding() {
        let (lifecycle, _binding, provider) = harness();
        let err = lifecycle
            .submit(None, ContentDigest::of(b"x"), true, 50)
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::BindingMissing);
        // No external call was made
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_input_locally() {
        let (lifecycle, binding, provider) = harness();
        let err = lifecycle
            .submit(Some(&binding), ContentDigest::ZERO, true, 50)
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::Validation(ValidationError::EmptyDigest));
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_confirms() {
        let (lifecycle, binding, _provider) = harness();
        let digest = ContentDigest::of(b"article");

        let receipt = lifecycle
            .submit(Some(&binding), digest, true, 92)
            .await
            .unwrap();
        assert_eq!(receipt.block_number, 1);
        assert!(receipt.units_consumed > 0);

        let pending = lifecycle.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, TxStatus::Confirmed);
        assert_eq!(pending[0].block_number, Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_classified() {
        let (lifecycle, binding, _provider) = harness();
        let digest = ContentDigest::of(b"article");

        lifecycle
            .submit(Some(&binding), digest, true, 92)
            .await
            .unwrap();
        let err = lifecycle
            .submit(Some(&binding), digest, false, 5)
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::DuplicateRecord { digest });

        // The losing transaction reached a terminal Failed state
        let failed = lifecycle
            .pending()
            .into_iter()
            .filter(|tx| tx.status == TxStatus::Failed)
            .count();
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn test_user_rejection_classified() {
        let (lifecycle, binding, provider) = harness();
        provider.reject_next(CODE_USER_REJECTED, "user denied signature");

        let err = lifecycle
            .submit(Some(&binding), ContentDigest::of(b"x"), true, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::UserRejected { code: 4001, .. }));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_wrong_network_detected() {
        let (lifecycle, binding, _provider) = harness();
        let stale = binding.rebind(SigningContext {
            account: account(1),
            chain: ChainKey::new(99),
        });

        let err = lifecycle
            .estimate(Some(&stale), ContentDigest::of(b"x"), true, 50)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::WrongNetwork {
                expected: ChainKey::new(1),
                actual: ChainKey::new(99),
            }
        );
    }

    #[tokio::test]
    async fn test_estimate_returns_total() {
        let (lifecycle, binding, _provider) = harness();
        let estimate = lifecycle
            .estimate(Some(&binding), ContentDigest::of(b"x"), true, 50)
            .await
            .unwrap();
        assert_eq!(
            estimate.total_cost,
            estimate.unit_price * estimate.units_estimated as u128
        );
    }

    #[tokio::test]
    async fn test_estimate_without_binding() {
        let (lifecycle, _binding, _provider) = harness();
        let err = lifecycle
            .estimate(None, ContentDigest::of(b"x"), true, 50)
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::BindingMissing);
    }
}
