/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Payload`] trait: what a block envelope needs from the execution layer's block type.

use std::fmt::Debug;

use crate::merkle::leaf_hash;

use super::data_types::CryptoHash;

/// Boxed error returned by the execution layer's payload codec.
pub type PayloadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Methods that the execution layer's block type needs to implement to be carried in a
/// [`BlockEnvelope`](super::block::BlockEnvelope).
///
/// The consensus core depends only on this capability and never on the concrete payload type. Besides
/// implementing the methods specified in the trait, implementors are expected to be *deterministic*:
/// `encode_payload` must produce the same bytes every time it is called on equal values, and
/// `decode_payload(encode_payload(p))` must produce a value equal to `p`.
pub trait Payload: Clone + Debug + Sized {
    /// Intermediate result of executing the payload (e.g., post-state and receipts) that a replica may
    /// cache in the envelope. Never serialized, hashed, or compared.
    type Outcome: Clone;

    /// Serialize the payload into its own independently-decodable bytes.
    fn encode_payload(&self) -> Result<Vec<u8>, PayloadError>;

    /// Deserialize a payload from the bytes produced by [`encode_payload`](Self::encode_payload).
    fn decode_payload(bytes: &[u8]) -> Result<Self, PayloadError>;

    /// Content hash of the payload, as defined by the execution layer.
    fn payload_hash(&self) -> CryptoHash;
}

/// Payload that is an uninterpreted byte string.
///
/// Useful for replicas that only relay blocks and never execute them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawPayload(pub Vec<u8>);

impl Payload for RawPayload {
    type Outcome = ();

    fn encode_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(self.0.clone())
    }

    fn decode_payload(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(RawPayload(bytes.to_vec()))
    }

    fn payload_hash(&self) -> CryptoHash {
        leaf_hash(&self.0)
    }
}
