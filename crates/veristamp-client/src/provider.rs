//! Wallet provider abstraction.
//!
//! The external signing provider supplies accounts, the active chain, and
//! two notification channels (account-changed, chain-changed). The client
//! never touches key material; signing happens on the provider's side.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use veristamp_core::{AccountId, ChainKey};

/// Provider error code for a user-rejected request (EIP-1193).
pub const CODE_USER_REJECTED: i64 = 4001;

/// Provider error code for an unrecognized chain.
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

/// Notifications pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The account list changed. Empty means the wallet disconnected.
    AccountsChanged(Vec<AccountId>),
    /// The active chain changed.
    ChainChanged(ChainKey),
}

/// Errors raised by the wallet provider.
///
/// The raw code and message are preserved end to end for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The user declined the request.
    #[error("provider request rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// The provider does not know the requested chain.
    #[error("unsupported chain: {0}")]
    UnsupportedChain(ChainKey),

    /// Transport-level failure talking to the provider.
    #[error("provider transport error: {0}")]
    Transport(String),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// The external signing provider.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access. The first account is the active signing
    /// identity. An empty list means the wallet holds no accounts.
    async fn request_accounts(&self) -> Result<Vec<AccountId>>;

    /// The provider's active chain.
    async fn chain_key(&self) -> Result<ChainKey>;

    /// Ask the provider to switch its active chain.
    ///
    /// On success the provider emits [`ProviderEvent::ChainChanged`].
    async fn switch_chain(&self, key: ChainKey) -> Result<()>;

    /// Present a submission to the user for signing.
    ///
    /// Returns when approved; fails `Rejected` when the user declines.
    /// Key material and the signature itself never leave the provider.
    async fn approve_submission(&self, from: AccountId, call: &[u8]) -> Result<()>;

    /// Subscribe to account-changed and chain-changed notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// A scriptable in-memory provider for testing.
///
/// Simulates wallet behavior: account lists, chain switches, user
/// rejections, and pushed notifications.
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// In-memory wallet provider.
    pub struct MemoryWalletProvider {
        state: Mutex<MemoryProviderState>,
        events: broadcast::Sender<ProviderEvent>,
        /// Number of requests served, for call-count assertions.
        requests: AtomicU64,
    }

    struct MemoryProviderState {
        accounts: Vec<AccountId>,
        chain: ChainKey,
        known_chains: Vec<ChainKey>,
        reject_next: Option<(i64, String)>,
    }

    impl MemoryWalletProvider {
        /// A provider holding the given accounts on the given chain.
        pub fn new(accounts: Vec<AccountId>, chain: ChainKey) -> Self {
            let (events, _) = broadcast::channel(64);
            Self {
                state: Mutex::new(MemoryProviderState {
                    accounts,
                    chain,
                    known_chains: vec![chain],
                    reject_next: None,
                }),
                events,
                requests: AtomicU64::new(0),
            }
        }

        /// Make additional chains switchable.
        pub fn with_known_chains(self, chains: Vec<ChainKey>) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                state.known_chains = chains;
            }
            self
        }

        /// Script the next request to fail as a user rejection.
        pub fn reject_next(&self, code: i64, message: impl Into<String>) {
            let mut state = self.state.lock().unwrap();
            state.reject_next = Some((code, message.into()));
        }

        /// Simulate the wallet switching accounts (or disconnecting, with
        /// an empty list).
        pub fn emit_accounts_changed(&self, accounts: Vec<AccountId>) {
            {
                let mut state = self.state.lock().unwrap();
                state.accounts = accounts.clone();
            }
            let _ = self.events.send(ProviderEvent::AccountsChanged(accounts));
        }

        /// Simulate the wallet switching chains.
        pub fn emit_chain_changed(&self, chain: ChainKey) {
            {
                let mut state = self.state.lock().unwrap();
                state.chain = chain;
            }
            let _ = self.events.send(ProviderEvent::ChainChanged(chain));
        }

        /// Number of requests this provider has served.
        pub fn request_count(&self) -> u64 {
            self.requests.load(Ordering::SeqCst)
        }

        fn take_scripted_rejection(&self) -> Option<ProviderError> {
            let mut state = self.state.lock().unwrap();
            state
                .reject_next
                .take()
                .map(|(code, message)| ProviderError::Rejected { code, message })
        }
    }

    #[async_trait]
    impl WalletProvider for MemoryWalletProvider {
        async fn request_accounts(&self) -> Result<Vec<AccountId>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.take_scripted_rejection() {
                return Err(err);
            }
            let state = self.state.lock().unwrap();
            Ok(state.accounts.clone())
        }

        async fn chain_key(&self) -> Result<ChainKey> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let state = self.state.lock().unwrap();
            Ok(state.chain)
        }

        async fn switch_chain(&self, key: ChainKey) -> Result<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.take_scripted_rejection() {
                return Err(err);
            }
            let known = {
                let state = self.state.lock().unwrap();
                state.known_chains.contains(&key)
            };
            if !known {
                return Err(ProviderError::UnsupportedChain(key));
            }
            self.emit_chain_changed(key);
            Ok(())
        }

        async fn approve_submission(&self, _from: AccountId, _call: &[u8]) -> Result<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.take_scripted_rejection() {
                return Err(err);
            }
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryWalletProvider;
    use super::*;

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 20])
    }

    #[tokio::test]
    async fn test_memory_provider_accounts() {
        let provider = MemoryWalletProvider::new(vec![account(1)], ChainKey::new(1));
        let accounts = provider.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![account(1)]);
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_provider_scripted_rejection() {
        let provider = MemoryWalletProvider::new(vec![account(1)], ChainKey::new(1));
        provider.reject_next(CODE_USER_REJECTED, "user denied account access");

        let err = provider.request_accounts().await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Rejected {
                code: CODE_USER_REJECTED,
                message: "user denied account access".into()
            }
        );

        // Rejection is one-shot
        assert!(provider.request_accounts().await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_provider_chain_switch_emits_event() {
        let provider = MemoryWalletProvider::new(vec![account(1)], ChainKey::new(1))
            .with_known_chains(vec![ChainKey::new(1), ChainKey::new(5)]);
        let mut events = provider.subscribe();

        provider.switch_chain(ChainKey::new(5)).await.unwrap();
        assert_eq!(provider.chain_key().await.unwrap(), ChainKey::new(5));
        assert_eq!(
            events.try_recv().unwrap(),
            ProviderEvent::ChainChanged(ChainKey::new(5))
        );
    }

    #[tokio::test]
    async fn test_memory_provider_declined_signature() {
        let provider = MemoryWalletProvider::new(vec![account(1)], ChainKey::new(1));
        provider.reject_next(CODE_USER_REJECTED, "signature declined");

        let err = provider
            .approve_submission(account(1), b"call")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { code: 4001, .. }));
    }

    #[tokio::test]
    async fn test_memory_provider_unknown_chain() {
        let provider = MemoryWalletProvider::new(vec![account(1)], ChainKey::new(1));
        let err = provider.switch_chain(ChainKey::new(99)).await.unwrap_err();
        assert_eq!(err, ProviderError::UnsupportedChain(ChainKey::new(99)));
    }
}
