//! The chain capability surface.
//!
//! One trait covers everything a caller can do against the verification
//! ledger. Two implementations exist ([`LiveChain`] here and
//! [`crate::mock::MockChain`]), and which one a client holds is decided
//! once, at construction. There is no runtime branching between them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use veristamp_core::{
    ChainKey, ContentDigest, ContractAddress, CostEstimate, PendingTransaction, TxHash,
    ValidationError, VerificationRecord,
};

use crate::binding::InterfaceSpec;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::endpoint::LedgerEndpoint;
use crate::error::{ChainError, Result};
use crate::lifecycle::{SubmitReceipt, TxLifecycle};
use crate::provider::WalletProvider;

/// Everything a client can do against the verification ledger.
#[async_trait]
pub trait ChainService: Send + Sync {
    /// Establish the signing context.
    async fn connect(&self) -> Result<ConnectionState>;

    /// Clear the signing context.
    async fn disconnect(&self);

    /// Snapshot of the connection state.
    async fn status(&self) -> ConnectionState;

    /// Bind the deployed store under the current signing context.
    async fn bind(&self, interface: InterfaceSpec, address: ContractAddress) -> Result<()>;

    /// Estimate the cost of storing a record.
    async fn estimate_cost(
        &self,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<CostEstimate>;

    /// Store a record and await its first inclusion.
    async fn submit(
        &self,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<SubmitReceipt>;

    /// Read a record by digest. `None` when no record is stored.
    async fn lookup(&self, digest: ContentDigest) -> Result<Option<VerificationRecord>>;

    /// Switch the provider to another chain.
    async fn switch_network(&self, key: ChainKey) -> Result<()>;

    /// Advisory confirmation count for a submitted transaction.
    async fn confirmations(&self, hash: TxHash) -> Result<u64>;

    /// Subscribe to connection events.
    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent>;
}

/// The live path: real provider, real endpoint.
pub struct LiveChain {
    connection: ConnectionManager,
    lifecycle: TxLifecycle,
    endpoint: Arc<dyn LedgerEndpoint>,
}

impl LiveChain {
    /// Compose the live path. `provider` is `None` in environments without
    /// a wallet; every connect then fails `WalletUnavailable`.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        endpoint: Arc<dyn LedgerEndpoint>,
    ) -> Self {
        let lifecycle = match &provider {
            Some(signer) => {
                TxLifecycle::new(Arc::clone(&endpoint)).with_signer(Arc::clone(signer))
            }
            None => TxLifecycle::new(Arc::clone(&endpoint)),
        };
        Self {
            connection: ConnectionManager::new(provider),
            lifecycle,
            endpoint,
        }
    }

    /// Transactions submitted through this chain, with their lifecycle
    /// status.
    pub fn pending(&self) -> Vec<PendingTransaction> {
        self.lifecycle.pending()
    }
}

#[async_trait]
impl ChainService for LiveChain {
    async fn connect(&self) -> Result<ConnectionState> {
        self.connection.connect().await
    }

    async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    async fn status(&self) -> ConnectionState {
        self.connection.status().await
    }

    async fn bind(&self, interface: InterfaceSpec, address: ContractAddress) -> Result<()> {
        self.connection.bind(interface, address).await.map(|_| ())
    }

    async fn estimate_cost(
        &self,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<CostEstimate> {
        let binding = self.connection.binding().await;
        self.lifecycle
            .estimate(binding.as_ref(), digest, is_authentic, confidence)
            .await
    }

    async fn submit(
        &self,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<SubmitReceipt> {
        // The binding is read once per submit: a notification landing
        // mid-flight refreshes the state for the *next* submit, never the
        // one already signed.
        let binding = self.connection.binding().await;
        self.lifecycle
            .submit(binding.as_ref(), digest, is_authentic, confidence)
            .await
    }

    async fn lookup(&self, digest: ContentDigest) -> Result<Option<VerificationRecord>> {
        // Same cheap rejection the ledger applies, before any round-trip
        if digest.is_zero() {
            return Err(ChainError::Validation(ValidationError::EmptyDigest));
        }
        let binding = self
            .connection
            .binding()
            .await
            .ok_or(ChainError::BindingMissing)?;

        let record = self
            .endpoint
            .query_record(binding.address(), digest)
            .await
            .map_err(|err| ChainError::Unknown {
                code: None,
                message: err.to_string(),
            })?;

        // Decode the existence flag once, here at the boundary
        Ok(record.exists.then_some(record))
    }

    async fn switch_network(&self, key: ChainKey) -> Result<()> {
        self.connection.switch_network(key).await
    }

    async fn confirmations(&self, hash: TxHash) -> Result<u64> {
        self.lifecycle.confirmations(hash).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.subscribe()
    }
}
