//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a fully wired service over
//! the in-process endpoint and a scriptable wallet provider.

use std::sync::Arc;
use std::time::Duration;

use veristamp::{
    AccountId, ChainKey, ContentDigest, ContractAddress, InterfaceSpec, RecordLedger,
    VerificationService,
};
use veristamp_client::endpoint::embedded::EmbeddedEndpoint;
use veristamp_client::provider::memory::MemoryWalletProvider;
use veristamp_ledger::{FixedClock, LedgerClock};

/// Pinned ledger time used by deterministic harnesses.
pub const TEST_EPOCH_MS: i64 = 1_736_870_400_000;

/// A fully wired test harness: ledger, endpoint, provider, service.
pub struct TestHarness {
    /// The in-process ledger behind the endpoint.
    pub ledger: Arc<RecordLedger>,

    /// The scriptable wallet provider.
    pub provider: Arc<MemoryWalletProvider>,

    /// The deployed store address on the embedded endpoint.
    pub address: ContractAddress,

    /// The service facade under test.
    pub service: VerificationService,

    /// The chain everything is wired to.
    pub chain: ChainKey,
}

impl TestHarness {
    /// A harness with one account on chain 1 and a pinned clock.
    pub fn new() -> Self {
        Self::with_accounts(vec![test_account(1)])
    }

    /// A harness with the given provider accounts.
    pub fn with_accounts(accounts: Vec<AccountId>) -> Self {
        let chain = ChainKey::new(1);
        let clock: Arc<dyn LedgerClock> = Arc::new(FixedClock::at(TEST_EPOCH_MS));
        let ledger = Arc::new(RecordLedger::with_clock(clock));
        let endpoint = Arc::new(
            EmbeddedEndpoint::new(Arc::clone(&ledger), chain)
                .with_latency(Duration::from_millis(1)),
        );
        let address = endpoint.store_address();
        let provider = Arc::new(MemoryWalletProvider::new(accounts, chain));
        let service = VerificationService::live(Some(provider.clone()), endpoint);

        Self {
            ledger,
            provider,
            address,
            service,
            chain,
        }
    }

    /// Connect and bind the record store in one step.
    pub async fn connect_and_bind(&self) {
        self.service
            .connect()
            .await
            .expect("harness provider always connects");
        self.service
            .bind(InterfaceSpec::record_store(), self.address)
            .await
            .expect("harness bind cannot fail after connect");
    }

    /// Give the notification pump time to drain pending events.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A deterministic account for test wiring.
pub fn test_account(byte: u8) -> AccountId {
    AccountId::from_bytes([byte; 20])
}

/// A random account, for tests that need fresh identities.
pub fn random_account() -> AccountId {
    AccountId::from_bytes(rand::random())
}

/// Digest of test content (the same fingerprint the digest utility
/// computes in production).
pub fn digest_of(content: &[u8]) -> ContentDigest {
    ContentDigest::of(content)
}

/// Install a compact tracing subscriber for test output. Safe to call
/// from multiple tests; only the first wins.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .compact()
        .try_init();
}
