/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Content addresses of blocks: [`BlockId`] and [`PartSetHeader`].
//!
//! A `BlockId` can be announced and compared before the block it refers to has been fully received:
//! its `hash` is the block's [chain hash](super::block::BlockEnvelope::hash), and its `parts_header`
//! commits to every [part](super::part_set::Part) the serialized block is split into.

use std::{
    fmt::{self, Display, Formatter},
    io::{self, Write},
};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::codec::canonical_bytes;

use super::data_types::CryptoHash;

/// Sign bytes of a zero [`BlockId`].
///
/// No non-zero `BlockId` encodes to these 4 bytes: the shortest canonical encoding of a `BlockId` is 6
/// bytes long.
pub const NULL_BLOCK_ID_SIGN_BYTES: &[u8] = b"null";

/// Descriptor of the [part set](super::part_set::PartSet) a serialized block is split into.
///
/// `total` is the number of parts, and `hash` the Merkle root over the parts' bytes. The zero
/// `PartSetHeader` has `total == 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct PartSetHeader {
    pub total: u32,
    pub hash: Option<CryptoHash>,
}

impl PartSetHeader {
    /// Create a new `PartSetHeader`.
    pub fn new(total: u32, hash: CryptoHash) -> PartSetHeader {
        PartSetHeader {
            total,
            hash: Some(hash),
        }
    }

    /// Get the zero `PartSetHeader`.
    pub const fn zero() -> PartSetHeader {
        PartSetHeader {
            total: 0,
            hash: None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total == 0
    }

    /// Structural equality. Equivalent to `==`.
    pub fn equals(&self, other: &PartSetHeader) -> bool {
        self == other
    }
}

impl Display for PartSetHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.hash {
            Some(hash) => write!(f, "{}:{:X}", self.total, hash),
            None => write!(f, "{}:", self.total),
        }
    }
}

/// Content address of a block.
///
/// The zero `BlockId` (no hash, zero parts header) denotes "no block". It is what the seen commit of a
/// height-1 block refers to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct BlockId {
    pub hash: Option<CryptoHash>,
    pub parts_header: PartSetHeader,
}

impl BlockId {
    /// Create a new `BlockId` referring to the block with chain hash `hash`, split into parts described by
    /// `parts_header`.
    pub fn new(hash: CryptoHash, parts_header: PartSetHeader) -> BlockId {
        BlockId {
            hash: Some(hash),
            parts_header,
        }
    }

    /// Get the zero `BlockId`.
    pub const fn zero() -> BlockId {
        BlockId {
            hash: None,
            parts_header: PartSetHeader::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.hash.is_none() && self.parts_header.is_zero()
    }

    /// Structural equality over `hash` and `parts_header`. Equivalent to `==`.
    pub fn equals(&self, other: &BlockId) -> bool {
        self == other
    }

    /// Get a string that identifies this `BlockId`, suitable as a map key for tracking blocks that are
    /// still being received.
    ///
    /// The key is the base64 encoding of the hash (with its presence tag) followed by the canonically
    /// encoded `parts_header`. Because the presence tag fixes the length of the hash portion, distinct
    /// `(hash, parts_header)` pairs never share a key.
    pub fn key(&self) -> String {
        let mut key_bytes = canonical_bytes(&self.hash);
        key_bytes.extend(canonical_bytes(&self.parts_header));
        STANDARD_NO_PAD.encode(key_bytes)
    }

    /// Write the form of this `BlockId` that is embedded in signed vote payloads into `writer`.
    ///
    /// A zero `BlockId` writes [`NULL_BLOCK_ID_SIGN_BYTES`]; any other `BlockId` writes its canonical
    /// encoding. Validators that sign over a zero `BlockId` therefore attest to something recognizably
    /// different from any real block.
    pub fn write_sign_bytes<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.is_zero() {
            writer.write_all(NULL_BLOCK_ID_SIGN_BYTES)
        } else {
            self.serialize(writer)
        }
    }

    /// Get the bytes written by [`write_sign_bytes`](Self::write_sign_bytes).
    pub fn sign_bytes(&self) -> Vec<u8> {
        if self.is_zero() {
            NULL_BLOCK_ID_SIGN_BYTES.to_vec()
        } else {
            canonical_bytes(self)
        }
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.hash {
            Some(hash) => write!(f, "{:X}:{}", hash, self.parts_header),
            None => write!(f, ":{}", self.parts_header),
        }
    }
}
