//! The mock simulation layer.
//!
//! Implements the same [`ChainService`] surface as the live path, backed
//! by in-memory state and artificial latency, so callers cannot tell the
//! difference except by the absence of real external calls.
//!
//! Lookups consult only the seeded record set; simulated stores are
//! tracked for duplicate detection but are never visible to reads. Tests
//! that need a positive lookup seed it through [`MockOptions::seed`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use veristamp_core::{
    validate_submission, AccountId, ChainKey, ContentDigest, ContractAddress, CostEstimate,
    TxHash, ValidationError, VerificationRecord,
};

use crate::binding::{BindingHandle, InterfaceSpec, SigningContext};
use crate::chain::ChainService;
use crate::connection::{ConnectionEvent, ConnectionPhase, ConnectionState};
use crate::error::{ChainError, Result};
use crate::lifecycle::SubmitReceipt;

/// Simulated execution units per store.
const MOCK_UNITS: u64 = 66_000;

/// Simulated price per unit.
const MOCK_UNIT_PRICE: u128 = 30;

/// Configuration for the simulation layer.
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// The simulated signing identity.
    pub account: AccountId,

    /// The simulated chain.
    pub chain: ChainKey,

    /// Artificial latency applied to connect and submit.
    pub latency: Duration,

    /// Records visible to `lookup`.
    pub seed: Vec<VerificationRecord>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            account: AccountId::from_bytes([0xee; 20]),
            chain: ChainKey::new(1337),
            latency: Duration::from_millis(50),
            seed: Vec::new(),
        }
    }
}

struct MockState {
    phase: ConnectionPhase,
    chain: ChainKey,
    binding: Option<BindingHandle>,
    /// Digests stored in this simulation, for duplicate detection only.
    stored: HashSet<ContentDigest>,
    /// Records visible to lookups.
    seeded: HashMap<ContentDigest, VerificationRecord>,
    /// Inclusion block per simulated transaction.
    included: HashMap<TxHash, u64>,
    height: u64,
    nonce: u64,
}

/// In-memory stand-in for the live chain path.
pub struct MockChain {
    opts: MockOptions,
    state: Mutex<MockState>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl MockChain {
    /// Create a simulation with the given options.
    pub fn new(opts: MockOptions) -> Self {
        let seeded = opts
            .seed
            .iter()
            .map(|record| (record.content_digest, record.clone()))
            .collect();
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(MockState {
                phase: ConnectionPhase::Disconnected,
                chain: opts.chain,
                binding: None,
                stored: HashSet::new(),
                seeded,
                included: HashMap::new(),
                height: 0,
                nonce: 0,
            }),
            opts,
            events,
        }
    }

    fn snapshot(state: &MockState, account: AccountId) -> ConnectionState {
        ConnectionState {
            account: (state.phase == ConnectionPhase::Connected).then_some(account),
            chain: (state.phase == ConnectionPhase::Connected).then_some(state.chain),
            binding: state.binding.clone(),
            phase: state.phase,
        }
    }

    fn next_tx_hash(state: &mut MockState) -> TxHash {
        state.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"veristamp-mock-tx-v0:");
        hasher.update(&state.nonce.to_be_bytes());
        TxHash::from_bytes(*hasher.finalize().as_bytes())
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new(MockOptions::default())
    }
}

#[async_trait]
impl ChainService for MockChain {
    async fn connect(&self) -> Result<ConnectionState> {
        tokio::time::sleep(self.opts.latency).await;

        let snapshot = {
            let mut state = self.state.lock().expect("mock lock poisoned");
            state.phase = ConnectionPhase::Connected;
            Self::snapshot(&state, self.opts.account)
        };

        debug!(account = %self.opts.account, "mock connected");
        let _ = self.events.send(ConnectionEvent::Connected {
            account: self.opts.account,
            chain: snapshot.chain.expect("connected snapshot has a chain"),
        });
        Ok(snapshot)
    }

    async fn disconnect(&self) {
        let mut state = self.state.lock().expect("mock lock poisoned");
        state.phase = ConnectionPhase::Disconnected;
        state.binding = None;
    }

    async fn status(&self) -> ConnectionState {
        let state = self.state.lock().expect("mock lock poisoned");
        Self::snapshot(&state, self.opts.account)
    }

    async fn bind(&self, interface: InterfaceSpec, address: ContractAddress) -> Result<()> {
        let mut state = self.state.lock().expect("mock lock poisoned");
        if state.phase != ConnectionPhase::Connected {
            return Err(ChainError::NotConnected);
        }
        let signer = SigningContext {
            account: self.opts.account,
            chain: state.chain,
        };
        state.binding = Some(BindingHandle::derive(interface, address, signer));
        Ok(())
    }

    async fn estimate_cost(
        &self,
        digest: ContentDigest,
        _is_authentic: bool,
        confidence: u8,
    ) -> Result<CostEstimate> {
        {
            let state = self.state.lock().expect("mock lock poisoned");
            if state.binding.is_none() {
                return Err(ChainError::BindingMissing);
            }
        }
        validate_submission(&digest, confidence)?;
        Ok(CostEstimate::new(MOCK_UNITS, MOCK_UNIT_PRICE))
    }

    async fn submit(
        &self,
        digest: ContentDigest,
        _is_authentic: bool,
        confidence: u8,
    ) -> Result<SubmitReceipt> {
        {
            let state = self.state.lock().expect("mock lock poisoned");
            if state.binding.is_none() {
                return Err(ChainError::BindingMissing);
            }
        }
        validate_submission(&digest, confidence)?;

        tokio::time::sleep(self.opts.latency).await;

        let mut state = self.state.lock().expect("mock lock poisoned");
        if !state.stored.insert(digest) {
            return Err(ChainError::DuplicateRecord { digest });
        }
        state.height += 1;
        let block_number = state.height;
        let tx_hash = Self::next_tx_hash(&mut state);
        state.included.insert(tx_hash, block_number);

        debug!(%tx_hash, %digest, "mock submission confirmed");
        Ok(SubmitReceipt {
            tx_hash,
            block_number,
            units_consumed: MOCK_UNITS,
        })
    }

    async fn lookup(&self, digest: ContentDigest) -> Result<Option<VerificationRecord>> {
        if digest.is_zero() {
            return Err(ChainError::Validation(ValidationError::EmptyDigest));
        }
        let state = self.state.lock().expect("mock lock poisoned");
        if state.binding.is_none() {
            return Err(ChainError::BindingMissing);
        }
        // Only the seeded set is consulted; see module docs
        Ok(state.seeded.get(&digest).cloned())
    }

    async fn switch_network(&self, key: ChainKey) -> Result<()> {
        let mut state = self.state.lock().expect("mock lock poisoned");
        if state.phase != ConnectionPhase::Connected {
            return Err(ChainError::NotConnected);
        }
        state.chain = key;
        state.binding = None;
        drop(state);
        let _ = self.events.send(ConnectionEvent::ChainChanged(key));
        Ok(())
    }

    async fn confirmations(&self, hash: TxHash) -> Result<u64> {
        let state = self.state.lock().expect("mock lock poisoned");
        let included_at = state.included.get(&hash).copied().ok_or_else(|| {
            ChainError::Unknown {
                code: None,
                message: format!("unknown transaction {hash}"),
            }
        })?;
        Ok(state.height.saturating_sub(included_at) + 1)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}
