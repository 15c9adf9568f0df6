//! The client service surface.
//!
//! [`VerificationService`] is the one explicit context object constructed
//! at the composition root and injected into everything that talks to the
//! ledger. There is no ambient module-level state; dropping the service
//! drops the whole client.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::info;

use veristamp_client::{
    ChainError, ChainService, ConnectionEvent, ConnectionState, InterfaceSpec, LiveChain,
    LedgerEndpoint, MockChain, MockOptions, SubmitReceipt, WalletProvider,
};
use veristamp_core::{
    ChainKey, ContentDigest, ContractAddress, CostEstimate, TxHash, VerificationRecord,
};

/// The unified client surface for the verification ledger.
///
/// Holds one capability implementation selected at construction, plus an
/// optional mock overlay: while a mock is enabled every call goes to the
/// simulation, and `disable_mock` restores the original backend.
pub struct VerificationService {
    backend: Arc<dyn ChainService>,
    mock: RwLock<Option<Arc<MockChain>>>,
}

impl VerificationService {
    /// Construct over an explicit capability implementation.
    pub fn new(backend: Arc<dyn ChainService>) -> Self {
        Self {
            backend,
            mock: RwLock::new(None),
        }
    }

    /// Construct the live path from a provider and an endpoint.
    pub fn live(
        provider: Option<Arc<dyn WalletProvider>>,
        endpoint: Arc<dyn LedgerEndpoint>,
    ) -> Self {
        Self::new(Arc::new(LiveChain::new(provider, endpoint)))
    }

    /// The currently active backend: the mock while one is enabled,
    /// otherwise the constructed implementation.
    fn active(&self) -> Arc<dyn ChainService> {
        let mock = self.mock.read().expect("mock lock poisoned");
        match mock.as_ref() {
            Some(mock) => Arc::clone(mock) as Arc<dyn ChainService>,
            None => Arc::clone(&self.backend),
        }
    }

    /// Route all subsequent calls to an in-memory simulation.
    pub fn enable_mock(&self, options: MockOptions) {
        info!("mock simulation enabled");
        let mut mock = self.mock.write().expect("mock lock poisoned");
        *mock = Some(Arc::new(MockChain::new(options)));
    }

    /// Restore the constructed backend. No-op if no mock is enabled.
    pub fn disable_mock(&self) {
        let mut mock = self.mock.write().expect("mock lock poisoned");
        if mock.take().is_some() {
            info!("mock simulation disabled");
        }
    }

    /// Whether the mock simulation is currently active.
    pub fn mock_enabled(&self) -> bool {
        self.mock.read().expect("mock lock poisoned").is_some()
    }

    /// Establish the signing context. See [`ChainService::connect`].
    pub async fn connect(&self) -> Result<ConnectionState, ChainError> {
        self.active().connect().await
    }

    /// Clear the signing context.
    pub async fn disconnect(&self) {
        self.active().disconnect().await;
    }

    /// Snapshot of the connection state. Idempotent absent intervening
    /// mutation.
    pub async fn connection_status(&self) -> ConnectionState {
        self.active().status().await
    }

    /// Bind the deployed store under the current signing context.
    pub async fn bind(
        &self,
        interface: InterfaceSpec,
        address: ContractAddress,
    ) -> Result<(), ChainError> {
        self.active().bind(interface, address).await
    }

    /// Estimate the cost of storing a record.
    pub async fn estimate_cost(
        &self,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<CostEstimate, ChainError> {
        self.active()
            .estimate_cost(digest, is_authentic, confidence)
            .await
    }

    /// Store a record and await its first inclusion.
    ///
    /// There is deliberately no client-side guard against a second
    /// submission for the same digest while the first is pending; the
    /// ledger's duplicate invariant decides the race.
    pub async fn submit(
        &self,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<SubmitReceipt, ChainError> {
        self.active().submit(digest, is_authentic, confidence).await
    }

    /// Read a record by digest. `None` when no record is stored.
    pub async fn lookup(
        &self,
        digest: ContentDigest,
    ) -> Result<Option<VerificationRecord>, ChainError> {
        self.active().lookup(digest).await
    }

    /// Switch the provider to another chain. The chain-changed
    /// notification invalidates every chain-scoped artifact.
    pub async fn switch_network(&self, key: ChainKey) -> Result<(), ChainError> {
        self.active().switch_network(key).await
    }

    /// Advisory confirmation count for a submitted transaction.
    pub async fn confirmations(&self, hash: TxHash) -> Result<u64, ChainError> {
        self.active().confirmations(hash).await
    }

    /// Subscribe to connection events from the active backend.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.active().subscribe_events()
    }
}
