//! Contract binding: interface description + deployed address + signing
//! context, combined into a callable reference.
//!
//! A [`BindingHandle`] is opaque and cheap to clone. Rebinding re-derives
//! the handle with the same interface and address under a new signing
//! context; it never mutates an existing handle.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use veristamp_core::{AccountId, ChainKey, ContentDigest, ContractAddress};

/// Name of the store operation in the record-store interface.
pub const OP_STORE_RECORD: &str = "store_record";

/// Name of the read operation in the record-store interface.
pub const OP_GET_RECORD: &str = "get_record";

/// Description of a deployed store's callable surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    /// Interface name, e.g. `"veristamp.record-store/v0"`.
    pub name: String,

    /// Operation names exposed by the store.
    pub operations: Vec<String>,
}

impl InterfaceSpec {
    /// The record-store interface.
    pub fn record_store() -> Self {
        Self {
            name: "veristamp.record-store/v0".to_string(),
            operations: vec![OP_STORE_RECORD.to_string(), OP_GET_RECORD.to_string()],
        }
    }

    /// Derive the 4-byte selector for an operation.
    ///
    /// Blake3 over `interface_name || ":" || operation`, truncated.
    pub fn selector(&self, operation: &str) -> [u8; 4] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(b":");
        hasher.update(operation.as_bytes());
        let hash = hasher.finalize();
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash.as_bytes()[..4]);
        selector
    }

    /// Whether the interface exposes the given operation.
    pub fn has_operation(&self, operation: &str) -> bool {
        self.operations.iter().any(|op| op == operation)
    }
}

/// The signing context a binding was derived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningContext {
    /// The active signing identity.
    pub account: AccountId,

    /// The chain the context is valid on.
    pub chain: ChainKey,
}

/// A callable reference to a deployed store.
#[derive(Debug, Clone)]
pub struct BindingHandle {
    interface: Arc<InterfaceSpec>,
    address: ContractAddress,
    signer: SigningContext,
}

impl BindingHandle {
    /// Derive a handle from interface, address, and signing context.
    pub fn derive(
        interface: InterfaceSpec,
        address: ContractAddress,
        signer: SigningContext,
    ) -> Self {
        Self {
            interface: Arc::new(interface),
            address,
            signer,
        }
    }

    /// Re-derive with the same interface and address under a new signing
    /// context.
    pub fn rebind(&self, signer: SigningContext) -> Self {
        Self {
            interface: Arc::clone(&self.interface),
            address: self.address,
            signer,
        }
    }

    /// The deployed store address.
    pub fn address(&self) -> ContractAddress {
        self.address
    }

    /// The signing context this handle was derived under.
    pub fn signer(&self) -> SigningContext {
        self.signer
    }

    /// The interface description.
    pub fn interface(&self) -> &InterfaceSpec {
        &self.interface
    }

    /// Encode a store call through this binding.
    pub fn encode_store(&self, call: &StoreCall) -> Bytes {
        call.encode(self.interface.selector(OP_STORE_RECORD))
    }
}

/// Arguments of one `store_record` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCall {
    /// The content fingerprint to store under.
    pub digest: ContentDigest,

    /// The verdict.
    pub is_authentic: bool,

    /// Confidence, 0..=100.
    pub confidence: u8,
}

/// Encoded length: selector + digest + flag + confidence.
const STORE_CALL_LEN: usize = 4 + 32 + 1 + 1;

impl StoreCall {
    /// Wire-encode: `selector || digest || is_authentic || confidence`.
    pub fn encode(&self, selector: [u8; 4]) -> Bytes {
        let mut buf = BytesMut::with_capacity(STORE_CALL_LEN);
        buf.put_slice(&selector);
        buf.put_slice(self.digest.as_bytes());
        buf.put_u8(self.is_authentic as u8);
        buf.put_u8(self.confidence);
        buf.freeze()
    }

    /// Decode from wire bytes. Done exactly once, at the endpoint
    /// boundary; downstream code only ever sees the typed call.
    ///
    /// Returns `None` for malformed call data.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() != STORE_CALL_LEN {
            return None;
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&data[4..36]);
        Some(Self {
            digest: ContentDigest::from_bytes(digest),
            is_authentic: data[36] != 0,
            confidence: data[37],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> SigningContext {
        SigningContext {
            account: AccountId::from_bytes([0xaa; 20]),
            chain: ChainKey::new(1),
        }
    }

    #[test]
    fn test_selectors_distinct_per_operation() {
        let spec = InterfaceSpec::record_store();
        assert_ne!(spec.selector(OP_STORE_RECORD), spec.selector(OP_GET_RECORD));
        assert_eq!(
            spec.selector(OP_STORE_RECORD),
            spec.selector(OP_STORE_RECORD)
        );
    }

    #[test]
    fn test_store_call_wire_roundtrip() {
        let call = StoreCall {
            digest: ContentDigest::of(b"content"),
            is_authentic: true,
            confidence: 92,
        };
        let spec = InterfaceSpec::record_store();
        let encoded = call.encode(spec.selector(OP_STORE_RECORD));

        assert_eq!(encoded.len(), STORE_CALL_LEN);
        assert_eq!(StoreCall::decode(&encoded).unwrap(), call);
    }

    #[test]
    fn test_store_call_decode_rejects_truncated() {
        assert!(StoreCall::decode(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_rebind_keeps_interface_and_address() {
        let handle = BindingHandle::derive(
            InterfaceSpec::record_store(),
            ContractAddress::from_bytes([0x01; 20]),
            test_signer(),
        );

        let new_signer = SigningContext {
            account: AccountId::from_bytes([0xbb; 20]),
            chain: ChainKey::new(1),
        };
        let rebound = handle.rebind(new_signer);

        assert_eq!(rebound.address(), handle.address());
        assert_eq!(rebound.interface(), handle.interface());
        assert_eq!(rebound.signer(), new_signer);
        // Original handle is untouched
        assert_eq!(handle.signer(), test_signer());
    }
}
