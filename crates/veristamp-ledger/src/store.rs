//! The record store state machine.
//!
//! One lock guards all state: the ledger's serialized execution model.
//! The duplicate check and the insert happen under the same critical
//! section, so a second store for a digest can never race past the first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;

use veristamp_core::{
    validate_submission, AccountId, ContentDigest, VerificationRecord,
};

use crate::clock::{LedgerClock, SystemClock};
use crate::error::{LedgerError, Result};
use crate::event::RecordStored;

/// Capacity of the store-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Outcome of a successful store.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    /// The emitted notification, carrying the full record.
    pub event: RecordStored,

    /// Ledger height at which the record was included.
    pub block_number: u64,
}

struct LedgerInner {
    /// Records keyed by digest.
    records: HashMap<ContentDigest, VerificationRecord>,

    /// Per-identity append-only index of stored digests, in call order.
    user_index: HashMap<AccountId, Vec<ContentDigest>>,

    /// Ledger height, bumped once per successful write.
    height: u64,
}

/// The ledger-resident verification record store.
pub struct RecordLedger {
    inner: Mutex<LedgerInner>,
    clock: Arc<dyn LedgerClock>,
    events: broadcast::Sender<RecordStored>,
}

impl RecordLedger {
    /// Create an empty ledger using wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty ledger with an explicit time source.
    pub fn with_clock(clock: Arc<dyn LedgerClock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(LedgerInner {
                records: HashMap::new(),
                user_index: HashMap::new(),
                height: 0,
            }),
            clock,
            events,
        }
    }

    /// Subscribe to store notifications.
    ///
    /// Observers receive every [`RecordStored`] emitted after the call,
    /// independent of the submitting client.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordStored> {
        self.events.subscribe()
    }

    /// Store a verification record.
    ///
    /// Preconditions: non-zero digest, confidence 0..=100, no existing
    /// record for the digest. On any violation the error is returned and
    /// no state changes.
    pub fn store_record(
        &self,
        caller: AccountId,
        digest: ContentDigest,
        is_authentic: bool,
        confidence: u8,
    ) -> Result<StoreOutcome> {
        validate_submission(&digest, confidence)?;

        let mut inner = self.inner.lock().expect("ledger lock poisoned");

        if inner.records.contains_key(&digest) {
            return Err(LedgerError::DuplicateRecord { digest });
        }

        let created_at = self.clock.now();
        let record = VerificationRecord {
            content_digest: digest,
            is_authentic,
            confidence,
            created_at,
            verifier: caller,
            exists: true,
        };

        inner.records.insert(digest, record);
        inner.user_index.entry(caller).or_default().push(digest);
        inner.height += 1;
        let block_number = inner.height;
        drop(inner);

        debug!(%digest, %caller, confidence, "record stored");

        let event = RecordStored {
            content_digest: digest,
            verifier: caller,
            is_authentic,
            confidence,
            created_at,
        };
        // No subscribers is fine; the event is still part of the outcome.
        let _ = self.events.send(event.clone());

        Ok(StoreOutcome {
            event,
            block_number,
        })
    }

    /// Get the record for a digest.
    ///
    /// Pure read. Returns [`VerificationRecord::absent`] when no record is
    /// stored; callers check `exists`, never field values.
    pub fn get_record(&self, digest: &ContentDigest) -> VerificationRecord {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner
            .records
            .get(digest)
            .cloned()
            .unwrap_or_else(VerificationRecord::absent)
    }

    /// All digests stored by an identity, in call order.
    pub fn get_user_records(&self, identity: &AccountId) -> Vec<ContentDigest> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.user_index.get(identity).cloned().unwrap_or_default()
    }

    /// Number of records stored by an identity.
    pub fn get_user_record_count(&self, identity: &AccountId) -> u64 {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner
            .user_index
            .get(identity)
            .map(|digests| digests.len() as u64)
            .unwrap_or(0)
    }

    /// Whether a record exists for the digest.
    pub fn record_exists(&self, digest: &ContentDigest) -> bool {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.records.contains_key(digest)
    }

    /// Current ledger height.
    pub fn height(&self) -> u64 {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.height
    }
}

impl Default for RecordLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use veristamp_core::ValidationError;

    fn test_ledger() -> RecordLedger {
        RecordLedger::with_clock(Arc::new(FixedClock::at(1_736_870_400_000)))
    }

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 20])
    }

    #[test]
    fn test_store_then_get() {
        let ledger = test_ledger();
        let digest = ContentDigest::of(b"article");

        let outcome = ledger
            .store_record(account(1), digest, true, 92)
            .unwrap();
        assert_eq!(outcome.block_number, 1);
        assert_eq!(outcome.event.confidence, 92);

        let record = ledger.get_record(&digest);
        assert!(record.exists);
        assert!(record.is_authentic);
        assert_eq!(record.confidence, 92);
        assert_eq!(record.verifier, account(1));
        assert_eq!(record.created_at, 1_736_870_400_000);
    }

    #[test]
    fn test_duplicate_store_fails_regardless_of_args() {
        let ledger = test_ledger();
        let digest = ContentDigest::of(b"article");

        ledger.store_record(account(1), digest, true, 92).unwrap();
        let err = ledger
            .store_record(account(2), digest, false, 10)
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateRecord { digest });

        // First record untouched
        let record = ledger.get_record(&digest);
        assert!(record.is_authentic);
        assert_eq!(record.verifier, account(1));
        // Loser's index did not grow
        assert_eq!(ledger.get_user_record_count(&account(2)), 0);
    }

    #[test]
    fn test_zero_digest_rejected_without_state_change() {
        let ledger = test_ledger();
        let err = ledger
            .store_record(account(1), ContentDigest::ZERO, true, 50)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Validation(ValidationError::EmptyDigest)
        );
        assert_eq!(ledger.height(), 0);
        assert_eq!(ledger.get_user_record_count(&account(1)), 0);
    }

    #[test]
    fn test_out_of_range_confidence_leaves_digest_absent() {
        let ledger = test_ledger();
        let digest = ContentDigest::of(b"article");

        let err = ledger
            .store_record(account(1), digest, true, 101)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Validation(ValidationError::ConfidenceOutOfRange { got: 101 })
        );
        assert!(!ledger.get_record(&digest).exists);
    }

    #[test]
    fn test_never_stored_digest_reads_absent() {
        let ledger = test_ledger();
        let record = ledger.get_record(&ContentDigest::of(b"unknown"));
        assert_eq!(record, VerificationRecord::absent());
        assert!(!ledger.record_exists(&ContentDigest::of(b"unknown")));
    }

    #[test]
    fn test_user_index_call_order() {
        let ledger = test_ledger();
        let d1 = ContentDigest::of(b"one");
        let d2 = ContentDigest::of(b"two");
        let d3 = ContentDigest::of(b"three");

        ledger.store_record(account(1), d1, true, 10).unwrap();
        ledger.store_record(account(2), d2, false, 20).unwrap();
        ledger.store_record(account(1), d3, true, 30).unwrap();

        assert_eq!(ledger.get_user_records(&account(1)), vec![d1, d3]);
        assert_eq!(ledger.get_user_record_count(&account(1)), 2);
        assert_eq!(ledger.get_user_records(&account(2)), vec![d2]);
        assert_eq!(ledger.get_user_record_count(&account(2)), 1);
    }

    #[test]
    fn test_height_bumps_per_successful_write_only() {
        let ledger = test_ledger();
        let digest = ContentDigest::of(b"one");

        ledger.store_record(account(1), digest, true, 10).unwrap();
        assert_eq!(ledger.height(), 1);

        let _ = ledger.store_record(account(1), digest, true, 10);
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn test_store_notification_carries_full_record() {
        let ledger = test_ledger();
        let mut events = ledger.subscribe();
        let digest = ContentDigest::of(b"article");

        ledger.store_record(account(7), digest, false, 64).unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.content_digest, digest);
        assert_eq!(event.verifier, account(7));
        assert!(!event.is_authentic);
        assert_eq!(event.confidence, 64);
        assert_eq!(event.created_at, 1_736_870_400_000);
    }
}
