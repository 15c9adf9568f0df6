//! Proptest generators for property-based testing.

use proptest::prelude::*;

use veristamp_core::{AccountId, ChainKey, ContentDigest, TxHash, MAX_CONFIDENCE};

/// Generate a non-zero content digest.
pub fn content_digest() -> impl Strategy<Value = ContentDigest> {
    any::<[u8; 32]>()
        .prop_filter("zero digest is a sentinel", |bytes| bytes != &[0u8; 32])
        .prop_map(ContentDigest::from_bytes)
}

/// Generate any digest, including the zero sentinel.
pub fn any_digest() -> impl Strategy<Value = ContentDigest> {
    prop_oneof![
        9 => content_digest(),
        1 => Just(ContentDigest::ZERO),
    ]
}

/// Generate an account identity.
pub fn account_id() -> impl Strategy<Value = AccountId> {
    any::<[u8; 20]>().prop_map(AccountId::from_bytes)
}

/// Generate a transaction hash.
pub fn tx_hash() -> impl Strategy<Value = TxHash> {
    any::<[u8; 32]>().prop_map(TxHash::from_bytes)
}

/// Generate a chain key.
pub fn chain_key() -> impl Strategy<Value = ChainKey> {
    (1u64..=1_000_000u64).prop_map(ChainKey::new)
}

/// Generate an in-range confidence value.
pub fn valid_confidence() -> impl Strategy<Value = u8> {
    0u8..=MAX_CONFIDENCE
}

/// Generate an out-of-range confidence value.
pub fn invalid_confidence() -> impl Strategy<Value = u8> {
    (MAX_CONFIDENCE + 1)..=u8::MAX
}

#[cfg(test)]
mod tests {
    use super::*;
    use veristamp_core::validate_submission;

    proptest! {
        #[test]
        fn valid_submissions_pass_validation(
            digest in content_digest(),
            confidence in valid_confidence(),
        ) {
            prop_assert!(validate_submission(&digest, confidence).is_ok());
        }

        #[test]
        fn invalid_confidence_fails_validation(
            digest in content_digest(),
            confidence in invalid_confidence(),
        ) {
            prop_assert!(validate_submission(&digest, confidence).is_err());
        }

        #[test]
        fn zero_digest_always_fails(confidence in valid_confidence()) {
            prop_assert!(validate_submission(&ContentDigest::ZERO, confidence).is_err());
        }
    }
}
