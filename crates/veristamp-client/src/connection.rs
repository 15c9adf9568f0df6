//! Connection manager: owner of the single client connection state.
//!
//! All mutation, whether caller-invoked or provider-notified, goes through
//! one `tokio::sync::Mutex`, so state changes are serialized and every
//! notification is handled run-to-completion before the next.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use veristamp_core::{AccountId, ChainKey, ContractAddress};

use crate::binding::{BindingHandle, InterfaceSpec, SigningContext};
use crate::error::{ChainError, Result};
use crate::provider::{ProviderError, ProviderEvent, WalletProvider, CODE_USER_REJECTED};

/// Capacity of the connection-event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No signing context.
    #[default]
    Disconnected,
    /// Account access requested, not yet granted.
    Connecting,
    /// Active signing context present.
    Connected,
}

/// The client connection state. Exactly one instance exists per
/// [`ConnectionManager`]; it is never duplicated or shared mutably.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    /// Active signing identity, if connected.
    pub account: Option<AccountId>,

    /// Chain the provider is on, if connected.
    pub chain: Option<ChainKey>,

    /// Current store binding, if bound.
    pub binding: Option<BindingHandle>,

    /// Lifecycle phase.
    pub phase: ConnectionPhase,
}

impl ConnectionState {
    /// Whether an active signing context is present.
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }
}

/// Notifications emitted on connection-state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A signing context was established.
    Connected {
        account: AccountId,
        chain: ChainKey,
    },
    /// The wallet disconnected (external "no accounts" signal).
    WalletDisconnected,
    /// The active identity changed; any binding was re-derived.
    AccountChanged(AccountId),
    /// The chain changed; the execution context was invalidated and the
    /// binding dropped.
    ChainChanged(ChainKey),
}

/// Owns connection state and reacts to provider notifications.
pub struct ConnectionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    state: Arc<Mutex<ConnectionState>>,
    events: broadcast::Sender<ConnectionEvent>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager over the given provider, or without one if the
    /// environment has none (every connect then fails `WalletUnavailable`).
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            provider,
            state: Arc::new(Mutex::new(ConnectionState::default())),
            events,
            pump: StdMutex::new(None),
        }
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Request account access and establish the signing context.
    ///
    /// Fails `WalletUnavailable` without a provider, `NoAccounts` when the
    /// provider yields an empty list. On success, subscribes to the
    /// provider's account-changed and chain-changed notifications.
    pub async fn connect(&self) -> Result<ConnectionState> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(ChainError::WalletUnavailable)?;

        let mut state = self.state.lock().await;
        state.phase = ConnectionPhase::Connecting;

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                state.phase = ConnectionPhase::Disconnected;
                return Err(classify_provider_error(err));
            }
        };
        let Some(&account) = accounts.first() else {
            state.phase = ConnectionPhase::Disconnected;
            return Err(ChainError::NoAccounts);
        };

        let chain = match provider.chain_key().await {
            Ok(chain) => chain,
            Err(err) => {
                state.phase = ConnectionPhase::Disconnected;
                return Err(classify_provider_error(err));
            }
        };

        state.account = Some(account);
        state.chain = Some(chain);
        state.phase = ConnectionPhase::Connected;
        let snapshot = state.clone();
        drop(state);

        self.spawn_pump(provider.subscribe());

        debug!(%account, %chain, "connected");
        let _ = self.events.send(ConnectionEvent::Connected { account, chain });
        Ok(snapshot)
    }

    /// Clear all connection state and stop listening to the provider.
    pub async fn disconnect(&self) {
        if let Some(pump) = self.pump.lock().expect("pump lock poisoned").take() {
            pump.abort();
        }
        let mut state = self.state.lock().await;
        *state = ConnectionState::default();
        debug!("disconnected");
    }

    /// Snapshot of the current state. Repeated calls without intervening
    /// mutation return identical snapshots.
    pub async fn status(&self) -> ConnectionState {
        self.state.lock().await.clone()
    }

    /// Derive and install a store binding under the current signing
    /// context. Requires `Connected`.
    pub async fn bind(
        &self,
        interface: InterfaceSpec,
        address: ContractAddress,
    ) -> Result<BindingHandle> {
        let mut state = self.state.lock().await;
        if !state.is_connected() {
            return Err(ChainError::NotConnected);
        }
        let signer = SigningContext {
            account: state.account.expect("connected state has an account"),
            chain: state.chain.expect("connected state has a chain"),
        };
        let handle = BindingHandle::derive(interface, address, signer);
        state.binding = Some(handle.clone());
        debug!(address = %handle.address(), "store bound");
        Ok(handle)
    }

    /// The current binding, if any.
    pub async fn binding(&self) -> Option<BindingHandle> {
        self.state.lock().await.binding.clone()
    }

    /// Ask the provider to switch chains. The resulting chain-changed
    /// notification invalidates the execution context (see
    /// [`ConnectionEvent::ChainChanged`]).
    pub async fn switch_network(&self, key: ChainKey) -> Result<()> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(ChainError::WalletUnavailable)?;
        if !self.state.lock().await.is_connected() {
            return Err(ChainError::NotConnected);
        }
        provider
            .switch_chain(key)
            .await
            .map_err(classify_provider_error)
    }

    /// Spawn (or replace) the single-consumer notification pump.
    fn spawn_pump(&self, mut receiver: broadcast::Receiver<ProviderEvent>) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => Self::apply_event(&state, &events, event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "provider notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut pump = self.pump.lock().expect("pump lock poisoned");
        if let Some(old) = pump.replace(handle) {
            old.abort();
        }
    }

    /// Apply one provider notification, run-to-completion under the state
    /// lock. Notifications arriving while disconnected are ignored.
    async fn apply_event(
        state: &Mutex<ConnectionState>,
        events: &broadcast::Sender<ConnectionEvent>,
        event: ProviderEvent,
    ) {
        let mut state = state.lock().await;
        if !state.is_connected() {
            return;
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    *state = ConnectionState::default();
                    debug!("wallet disconnected");
                    let _ = events.send(ConnectionEvent::WalletDisconnected);
                }
                Some(&account) if state.account != Some(account) => {
                    state.account = Some(account);
                    // Rebind an existing binding to the new signing context
                    if let Some(binding) = state.binding.take() {
                        let signer = SigningContext {
                            account,
                            chain: binding.signer().chain,
                        };
                        state.binding = Some(binding.rebind(signer));
                    }
                    debug!(%account, "account changed");
                    let _ = events.send(ConnectionEvent::AccountChanged(account));
                }
                Some(_) => {} // same account, nothing to do
            },
            ProviderEvent::ChainChanged(chain) => {
                // Cross-chain identifiers, costs, and addresses are not
                // interchangeable: drop every chain-scoped artifact.
                state.chain = Some(chain);
                state.binding = None;
                debug!(%chain, "chain changed, execution context invalidated");
                let _ = events.send(ConnectionEvent::ChainChanged(chain));
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Ok(mut pump) = self.pump.lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

/// Map a raw provider failure into the client taxonomy, preserving the
/// provider's code and message.
pub(crate) fn classify_provider_error(err: ProviderError) -> ChainError {
    match err {
        ProviderError::Rejected { code, message } if code == CODE_USER_REJECTED => {
            ChainError::UserRejected { code, message }
        }
        ProviderError::Rejected { code, message } => ChainError::Unknown {
            code: Some(code),
            message,
        },
        ProviderError::UnsupportedChain(key) => ChainError::Unknown {
            code: None,
            message: format!("provider does not know {key}"),
        },
        ProviderError::Transport(message) => ChainError::Unknown {
            code: None,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::MemoryWalletProvider;
    use std::time::Duration;

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 20])
    }

    fn manager_with(
        accounts: Vec<AccountId>,
        chain: ChainKey,
    ) -> (ConnectionManager, Arc<MemoryWalletProvider>) {
        let provider = Arc::new(MemoryWalletProvider::new(accounts, chain));
        let manager = ConnectionManager::new(Some(provider.clone()));
        (manager, provider)
    }

    async fn settle() {
        // Give the notification pump a chance to drain
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_connect_without_provider() {
        let manager = ConnectionManager::new(None);
        let err = manager.connect().await.unwrap_err();
        assert_eq!(err, ChainError::WalletUnavailable);
    }

    #[tokio::test]
    async fn test_connect_with_zero_accounts() {
        let (manager, _provider) = manager_with(vec![], ChainKey::new(1));
        let err = manager.connect().await.unwrap_err();
        assert_eq!(err, ChainError::NoAccounts);
        assert!(!manager.status().await.is_connected());
    }

    #[tokio::test]
    async fn test_connect_captures_identity_and_chain() {
        let (manager, _provider) = manager_with(vec![account(1)], ChainKey::new(5));
        let state = manager.connect().await.unwrap();

        assert!(state.is_connected());
        assert_eq!(state.account, Some(account(1)));
        assert_eq!(state.chain, Some(ChainKey::new(5)));
        assert!(state.binding.is_none());
    }

    #[tokio::test]
    async fn test_status_idempotent_without_mutation() {
        let (manager, _provider) = manager_with(vec![account(1)], ChainKey::new(1));
        manager.connect().await.unwrap();

        let a = manager.status().await;
        let b = manager.status().await;
        assert_eq!(a.account, b.account);
        assert_eq!(a.chain, b.chain);
        assert_eq!(a.phase, b.phase);
    }

    #[tokio::test]
    async fn test_bind_requires_connected() {
        let (manager, _provider) = manager_with(vec![account(1)], ChainKey::new(1));
        let err = manager
            .bind(
                InterfaceSpec::record_store(),
                ContractAddress::from_bytes([0x01; 20]),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::NotConnected);
    }

    #[tokio::test]
    async fn test_empty_accounts_signal_forces_disconnect() {
        let (manager, provider) = manager_with(vec![account(1)], ChainKey::new(1));
        manager.connect().await.unwrap();
        let mut events = manager.subscribe();

        provider.emit_accounts_changed(vec![]);
        settle().await;

        let state = manager.status().await;
        assert!(!state.is_connected());
        assert!(state.account.is_none());
        assert!(state.binding.is_none());
        assert_eq!(events.try_recv().unwrap(), ConnectionEvent::WalletDisconnected);
    }

    #[tokio::test]
    async fn test_account_change_rebinds() {
        let (manager, provider) = manager_with(vec![account(1)], ChainKey::new(1));
        manager.connect().await.unwrap();
        manager
            .bind(
                InterfaceSpec::record_store(),
                ContractAddress::from_bytes([0x01; 20]),
            )
            .await
            .unwrap();

        provider.emit_accounts_changed(vec![account(2)]);
        settle().await;

        let state = manager.status().await;
        assert_eq!(state.account, Some(account(2)));
        let binding = state.binding.expect("binding survives account change");
        assert_eq!(binding.signer().account, account(2));
    }

    #[tokio::test]
    async fn test_chain_change_drops_binding() {
        let (manager, provider) = manager_with(vec![account(1)], ChainKey::new(1));
        manager.connect().await.unwrap();
        manager
            .bind(
                InterfaceSpec::record_store(),
                ContractAddress::from_bytes([0x01; 20]),
            )
            .await
            .unwrap();
        let mut events = manager.subscribe();

        provider.emit_chain_changed(ChainKey::new(5));
        settle().await;

        let state = manager.status().await;
        assert!(state.is_connected());
        assert_eq!(state.chain, Some(ChainKey::new(5)));
        assert!(state.binding.is_none(), "chain change invalidates binding");
        assert_eq!(
            events.try_recv().unwrap(),
            ConnectionEvent::ChainChanged(ChainKey::new(5))
        );
    }

    #[tokio::test]
    async fn test_disconnect_clears_everything() {
        let (manager, _provider) = manager_with(vec![account(1)], ChainKey::new(1));
        manager.connect().await.unwrap();
        manager
            .bind(
                InterfaceSpec::record_store(),
                ContractAddress::from_bytes([0x01; 20]),
            )
            .await
            .unwrap();

        manager.disconnect().await;

        let state = manager.status().await;
        assert!(!state.is_connected());
        assert!(state.account.is_none());
        assert!(state.chain.is_none());
        assert!(state.binding.is_none());
    }

    #[tokio::test]
    async fn test_notifications_ignored_while_disconnected() {
        let (manager, provider) = manager_with(vec![account(1)], ChainKey::new(1));
        manager.connect().await.unwrap();
        manager.disconnect().await;

        provider.emit_accounts_changed(vec![account(9)]);
        settle().await;

        assert!(manager.status().await.account.is_none());
    }
}
