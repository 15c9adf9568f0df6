//! Durable store notification.
//!
//! Every successful `store_record` emits a [`RecordStored`] event carrying
//! the full record. External observers subscribe for independent audit
//! trails; the canonical encoding lets them content-address each event.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use veristamp_core::{AccountId, ContentDigest};

/// Event field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const CONTENT_DIGEST: u64 = 0;
    pub const VERIFIER: u64 = 1;
    pub const IS_AUTHENTIC: u64 = 2;
    pub const CONFIDENCE: u64 = 3;
    pub const CREATED_AT: u64 = 4;
}

/// A 32-byte event identifier: Blake3 over the canonical event bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub [u8; 32]);

impl EventId {
    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Notification emitted for every successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStored {
    /// The stored content fingerprint.
    pub content_digest: ContentDigest,

    /// Identity that stored the record.
    pub verifier: AccountId,

    /// The recorded verdict.
    pub is_authentic: bool,

    /// The recorded confidence, 0..=100.
    pub confidence: u8,

    /// Ledger-assigned creation time (Unix milliseconds).
    pub created_at: i64,
}

impl RecordStored {
    /// Encode to canonical CBOR bytes.
    ///
    /// Deterministic: integer-keyed map, keys in ascending order, definite
    /// lengths, no floats. The same event always produces identical bytes.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let entries = vec![
            (
                Value::Integer(keys::CONTENT_DIGEST.into()),
                Value::Bytes(self.content_digest.0.to_vec()),
            ),
            (
                Value::Integer(keys::VERIFIER.into()),
                Value::Bytes(self.verifier.0.to_vec()),
            ),
            (
                Value::Integer(keys::IS_AUTHENTIC.into()),
                Value::Bool(self.is_authentic),
            ),
            (
                Value::Integer(keys::CONFIDENCE.into()),
                Value::Integer(u64::from(self.confidence).into()),
            ),
            (
                Value::Integer(keys::CREATED_AT.into()),
                Value::Integer(self.created_at.into()),
            ),
        ];

        let mut buf = Vec::new();
        // Map keys are built pre-sorted (0..=4); encoding cannot fail on
        // an in-memory buffer.
        ciborium::ser::into_writer(&Value::Map(entries), &mut buf)
            .expect("CBOR encoding to Vec cannot fail");
        buf
    }

    /// Content-address of this event: domain-prefixed Blake3 over the
    /// canonical bytes.
    pub fn event_id(&self) -> EventId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"veristamp-event-v0:");
        hasher.update(&self.canonical_bytes());
        EventId(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> RecordStored {
        RecordStored {
            content_digest: ContentDigest::of(b"some content"),
            verifier: AccountId::from_bytes([0x11; 20]),
            is_authentic: true,
            confidence: 92,
            created_at: 1_736_870_400_000,
        }
    }

    #[test]
    fn test_canonical_bytes_deterministic() {
        let event = sample_event();
        assert_eq!(event.canonical_bytes(), event.canonical_bytes());
    }

    #[test]
    fn test_event_id_changes_with_content() {
        let a = sample_event();
        let mut b = sample_event();
        b.confidence = 91;

        assert_eq!(a.event_id(), sample_event().event_id());
        assert_ne!(a.event_id(), b.event_id());
    }

    #[test]
    fn test_canonical_bytes_is_cbor_map() {
        let bytes = sample_event().canonical_bytes();
        // Major type 5 (map), 5 entries
        assert_eq!(bytes[0], 0xa5);
    }
}
