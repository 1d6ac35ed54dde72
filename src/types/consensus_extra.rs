/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-block consensus metadata: [`ConsensusExtra`].

use std::{
    fmt::{self, Display, Formatter},
    sync::OnceLock,
};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{codec::canonical_bytes, merkle::MerkleFields};

use super::{
    commit::Commit,
    data_types::{BlockHeight, ChainID, CryptoHash, EpochNumber, Timestamp},
};

/// Consensus metadata that a block carries next to its execution payload.
///
/// The hash of the `ConsensusExtra` is the block's chain hash (see
/// [`BlockEnvelope::hash`](super::block::BlockEnvelope::hash)).
///
/// ## Seen commit hash
///
/// `seen_commit_hash` is derived from `seen_commit` exactly once, by
/// [`fill_seen_commit_hash`](Self::fill_seen_commit_hash), and never recomputed afterwards. Like
/// [`Commit`]'s hash cache it is a [`OnceLock`], so concurrent readers of a shared `ConsensusExtra` are
/// race-free. Blocks made by [`make_block`](super::block::make_block) have it filled before they are
/// returned.
#[derive(Clone, Debug)]
pub struct ConsensusExtra {
    pub chain_id: ChainID,
    pub height: BlockHeight,
    pub time: Timestamp,
    pub epoch_number: EpochNumber,
    pub validators_hash: CryptoHash,
    pub seen_commit: Option<Commit>,
    seen_commit_hash: OnceLock<CryptoHash>,
    pub epoch_bytes: Vec<u8>,
}

impl ConsensusExtra {
    /// Create a new `ConsensusExtra` whose seen commit hash is not yet filled.
    pub fn new(
        chain_id: ChainID,
        height: BlockHeight,
        time: Timestamp,
        epoch_number: EpochNumber,
        validators_hash: CryptoHash,
        seen_commit: Option<Commit>,
        epoch_bytes: Vec<u8>,
    ) -> ConsensusExtra {
        ConsensusExtra {
            chain_id,
            height,
            time,
            epoch_number,
            validators_hash,
            seen_commit,
            seen_commit_hash: OnceLock::new(),
            epoch_bytes,
        }
    }

    /// Compute and cache the hash of the seen commit, unless it is already cached. Returns the cached
    /// hash, or `None` if there is no seen commit.
    pub fn fill_seen_commit_hash(&self) -> Option<CryptoHash> {
        if let Some(hash) = self.seen_commit_hash.get() {
            return Some(*hash);
        }
        let seen_commit = self.seen_commit.as_ref()?;
        Some(*self.seen_commit_hash.get_or_init(|| seen_commit.hash()))
    }

    /// Get the cached seen commit hash without computing it.
    pub fn seen_commit_hash(&self) -> Option<&CryptoHash> {
        self.seen_commit_hash.get()
    }

    /// Get the chain hash: the Merkle root over this extra's fields, with the seen commit standing in as
    /// its hash.
    pub fn hash(&self) -> CryptoHash {
        self.fill_seen_commit_hash();
        self.merkle_hash()
    }
}

impl MerkleFields for ConsensusExtra {
    fn merkle_fields(&self) -> Vec<Vec<u8>> {
        vec![
            canonical_bytes(&self.chain_id),
            canonical_bytes(&self.height),
            canonical_bytes(&self.time),
            canonical_bytes(&self.epoch_number),
            canonical_bytes(&self.validators_hash),
            canonical_bytes(&self.seen_commit_hash.get().copied()),
            canonical_bytes(&self.epoch_bytes),
        ]
    }
}

impl PartialEq for ConsensusExtra {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id
            && self.height == other.height
            && self.time == other.time
            && self.epoch_number == other.epoch_number
            && self.validators_hash == other.validators_hash
            && self.seen_commit == other.seen_commit
            && self.epoch_bytes == other.epoch_bytes
    }
}

impl Eq for ConsensusExtra {}

impl Display for ConsensusExtra {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConsensusExtra{{ChainID: {}, Height: {}, Time: {}, Epoch: {}, ValidatorsHash: {:X}}}",
            self.chain_id, self.height, self.time, self.epoch_number, self.validators_hash
        )
    }
}

/// Intermediate representation of [`ConsensusExtra`] for serialization and deserialization.
///
/// `ConsensusExtra` keeps its seen commit hash in a `OnceLock`, which Borsh cannot derive for. This type
/// is exactly like `ConsensusExtra` but stores the hash as a plain `Option`, and is what goes on the
/// wire.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub(crate) struct ConsensusExtraBytes {
    chain_id: ChainID,
    height: BlockHeight,
    time: Timestamp,
    epoch_number: EpochNumber,
    validators_hash: CryptoHash,
    seen_commit: Option<Commit>,
    seen_commit_hash: Option<CryptoHash>,
    epoch_bytes: Vec<u8>,
}

impl From<&ConsensusExtra> for ConsensusExtraBytes {
    fn from(extra: &ConsensusExtra) -> Self {
        ConsensusExtraBytes {
            chain_id: extra.chain_id.clone(),
            height: extra.height,
            time: extra.time,
            epoch_number: extra.epoch_number,
            validators_hash: extra.validators_hash,
            seen_commit: extra.seen_commit.clone(),
            seen_commit_hash: extra.fill_seen_commit_hash(),
            epoch_bytes: extra.epoch_bytes.clone(),
        }
    }
}

impl From<ConsensusExtraBytes> for ConsensusExtra {
    fn from(bytes: ConsensusExtraBytes) -> Self {
        ConsensusExtra {
            chain_id: bytes.chain_id,
            height: bytes.height,
            time: bytes.time,
            epoch_number: bytes.epoch_number,
            validators_hash: bytes.validators_hash,
            seen_commit: bytes.seen_commit,
            seen_commit_hash: bytes
                .seen_commit_hash
                .map(OnceLock::from)
                .unwrap_or_default(),
            epoch_bytes: bytes.epoch_bytes,
        }
    }
}
