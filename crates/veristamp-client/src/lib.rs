//! # Veristamp Client
//!
//! The client side of the verification ledger: wallet connection state,
//! contract binding, and the write-transaction lifecycle.
//!
//! ## Architecture
//!
//! Two seams isolate the external world:
//!
//! - [`WalletProvider`] - the external signing provider (accounts, chain,
//!   account/chain-change notifications)
//! - [`LedgerEndpoint`] - the ledger node (submission, inclusion, reads)
//!
//! On top of those, [`ConnectionManager`] owns the single
//! [`ConnectionState`], [`TxLifecycle`] drives submissions to a terminal
//! outcome, and [`ChainService`] is the one capability surface with two
//! implementations: [`LiveChain`] and [`MockChain`]. Which one a client
//! talks to is decided once, at construction.

pub mod binding;
pub mod chain;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod provider;

pub use binding::{BindingHandle, InterfaceSpec, SigningContext, StoreCall};
pub use chain::{ChainService, LiveChain};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionPhase, ConnectionState};
pub use endpoint::{EndpointError, InclusionReceipt, LedgerEndpoint};
pub use error::{ChainError, Result, RetryAdvice};
pub use lifecycle::{SubmitReceipt, TxLifecycle};
pub use mock::{MockChain, MockOptions};
pub use provider::{ProviderError, ProviderEvent, WalletProvider};
