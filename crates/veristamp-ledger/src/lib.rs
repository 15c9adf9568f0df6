//! # Veristamp Ledger
//!
//! The ledger-resident record store: a deterministic, serially-executed
//! state machine that persists verification records keyed by content
//! digest and emits a durable notification for every successful store.
//!
//! Semantics:
//!
//! - At most one record per digest; records are immutable post-creation.
//! - Writes execute under a single lock, so the duplicate check is atomic
//!   with the insert; no concurrent caller can race past it.
//! - Every identity's record index is append-only and ordered by call.
//! - Failed writes leave no state change behind.

pub mod clock;
pub mod error;
pub mod event;
pub mod store;

pub use clock::{FixedClock, LedgerClock, SystemClock};
pub use error::{LedgerError, Result};
pub use event::{EventId, RecordStored};
pub use store::{RecordLedger, StoreOutcome};
