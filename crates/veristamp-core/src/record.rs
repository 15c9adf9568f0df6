//! Verification record: the authenticity verdict as stored on the ledger.
//!
//! Records are immutable once created. There is no update or delete
//! operation anywhere in the system; a digest is either absent or bound to
//! exactly one record forever.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{AccountId, ContentDigest};

/// Maximum confidence value (inclusive).
pub const MAX_CONFIDENCE: u8 = 100;

/// A verification record keyed by content digest.
///
/// `exists` distinguishes a stored record from the all-default record
/// returned for unknown digests. Callers must check `exists` and never
/// infer existence from the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// The content fingerprint (unique key).
    pub content_digest: ContentDigest,

    /// Whether the content was judged authentic (not AI-generated).
    pub is_authentic: bool,

    /// Confidence in the verdict, 0..=100.
    pub confidence: u8,

    /// Ledger-assigned creation time (Unix milliseconds).
    pub created_at: i64,

    /// Identity that submitted the record.
    pub verifier: AccountId,

    /// Whether a record is actually stored for this digest.
    pub exists: bool,
}

impl VerificationRecord {
    /// The record returned for a digest that was never stored: `exists`
    /// false, every other field at its default.
    pub fn absent() -> Self {
        Self {
            content_digest: ContentDigest::ZERO,
            is_authentic: false,
            confidence: 0,
            created_at: 0,
            verifier: AccountId::ZERO,
            exists: false,
        }
    }
}

/// Validate a submission before it touches the ledger.
///
/// The ledger performs the same checks; running them client-side avoids a
/// doomed network round-trip.
pub fn validate_submission(
    digest: &ContentDigest,
    confidence: u8,
) -> Result<(), ValidationError> {
    if digest.is_zero() {
        return Err(ValidationError::EmptyDigest);
    }
    if confidence > MAX_CONFIDENCE {
        return Err(ValidationError::ConfidenceOutOfRange { got: confidence });
    }
    Ok(())
}

/// Output of the external classification oracle, as received over its
/// JSON boundary.
///
/// The core consumes this only to derive submission arguments; model
/// internals never cross this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    /// Whether the oracle judged the content AI-generated.
    pub is_ai_generated: bool,

    /// Oracle confidence in 0.0..=1.0.
    pub confidence: f64,

    /// Name of the model that produced the verdict.
    pub model_name: String,

    /// Oracle-side processing time in seconds.
    #[serde(default)]
    pub processing_time: f64,
}

impl ClassifierVerdict {
    /// Map the oracle verdict to ledger submission arguments:
    /// `(is_authentic, confidence in 0..=100)`.
    pub fn to_submission(&self) -> (bool, u8) {
        let scaled = (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8;
        (!self.is_ai_generated, scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_record_defaults() {
        let record = VerificationRecord::absent();
        assert!(!record.exists);
        assert!(record.content_digest.is_zero());
        assert_eq!(record.confidence, 0);
        assert_eq!(record.created_at, 0);
        assert_eq!(record.verifier, AccountId::ZERO);
    }

    #[test]
    fn test_validate_rejects_zero_digest() {
        let result = validate_submission(&ContentDigest::ZERO, 50);
        assert_eq!(result, Err(ValidationError::EmptyDigest));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let digest = ContentDigest::of(b"content");
        let result = validate_submission(&digest, 101);
        assert_eq!(
            result,
            Err(ValidationError::ConfidenceOutOfRange { got: 101 })
        );
    }

    #[test]
    fn test_validate_accepts_boundaries() {
        let digest = ContentDigest::of(b"content");
        assert!(validate_submission(&digest, 0).is_ok());
        assert!(validate_submission(&digest, MAX_CONFIDENCE).is_ok());
    }

    #[test]
    fn test_classifier_verdict_from_oracle_json() {
        let json = r#"{
            "is_ai_generated": true,
            "confidence": 0.87,
            "model_name": "roberta-base-openai-detector",
            "processing_time": 0.42
        }"#;
        let verdict: ClassifierVerdict = serde_json::from_str(json).unwrap();
        let (is_authentic, confidence) = verdict.to_submission();
        assert!(!is_authentic);
        assert_eq!(confidence, 87);
    }

    #[test]
    fn test_classifier_verdict_clamps_confidence() {
        let verdict = ClassifierVerdict {
            is_ai_generated: false,
            confidence: 1.7,
            model_name: "m".into(),
            processing_time: 0.0,
        };
        assert_eq!(verdict.to_submission(), (true, 100));
    }
}
