/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the [`BlockEnvelope`] type and its associated methods.
//!
//! A block envelope wraps an execution-layer [`Payload`] together with the [`ConsensusExtra`] that
//! links it into the chain. Its lifecycle is:
//! 1. **Made**: the proposer calls [`make_block`], which stamps the current time and splits the
//!    serialized envelope into a [`PartSet`].
//! 2. **Broadcast**: the proposer announces the block's [`BlockId`] and gossips its parts.
//! 3. **Received**: every other replica collects the parts into a `PartSet` and rebuilds the envelope
//!    with [`BlockEnvelope::from_part_set`], then checks it with [`BlockEnvelope::validate_basic`]
//!    and [`BlockEnvelope::validate_linkage`] before voting on it.
//!
//! ## Chain hash
//!
//! The hash that identifies a block in the chain is the hash of its `ConsensusExtra`, not of its
//! payload. A block with no seen commit is unfinalizable and has no hash at all.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::Read,
    time::SystemTime,
};

use borsh::{BorshDeserialize, BorshSerialize};
use typed_builder::TypedBuilder;

use crate::{
    codec::{decode, decode_canonical, encode, read_bounded, DecodeError, EncodeError},
    config::{BlockConfiguration, DEFAULT_PART_SIZE},
    events::{DecodeBlockEvent, EncodeBlockEvent, MakeBlockEvent, RejectBlockEvent},
    logging::log_event,
};

use super::{
    block_id::{BlockId, PartSetHeader},
    commit::{Commit, CommitError},
    consensus_extra::{ConsensusExtra, ConsensusExtraBytes},
    data_types::{BlockHeight, ChainID, CryptoHash, EpochNumber, Timestamp},
    part_set::{PartSet, PartSetError},
    payload::{Payload, PayloadError},
};

/// A proof that transactions were included in a block of another chain.
///
/// Carried in blocks opaquely: this crate orders, encodes, and transfers them, but never interprets
/// them.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CrossChainProof {
    pub source_chain: ChainID,
    pub header: Vec<u8>,
    pub tx_indexes: Vec<u32>,
    pub tx_proofs: Vec<Vec<u8>>,
}

/// A payload of type `P`, with the consensus metadata that places it in the chain.
///
/// ## Transient result
///
/// A replica that executes the payload may cache the outcome in the envelope with
/// [`set_transient_result`](Self::set_transient_result). The transient result is local to the replica:
/// it is never serialized, hashed, or compared.
#[derive(Clone)]
pub struct BlockEnvelope<P: Payload> {
    pub payload: P,
    pub extra: ConsensusExtra,
    pub cross_chain_proofs: Vec<CrossChainProof>,
    transient_result: Option<P::Outcome>,
}

/// Everything needed to make a new block with [`make_block`].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [MakeBlockRequest]. On the builder call the following methods to
    construct a valid [MakeBlockRequest].

    Required:
    - `.height(...)`
    - `.chain_id(...)`
    - `.seen_commit(...)`
    - `.payload(...)`
    - `.validators_hash(...)`
    - `.epoch_number(...)`
    - `.epoch_bytes(...)`

    Optional:
    - `.cross_chain_proofs(...)`
    - `.part_size(...)`
"))]
pub struct MakeBlockRequest<P: Payload> {
    #[builder(setter(doc = "Set the height of the new block. Required."))]
    pub height: BlockHeight,
    #[builder(setter(doc = "Set the chain ID of the blockchain. Required."))]
    pub chain_id: ChainID,
    #[builder(setter(doc = "Set the commit for the parent block. For a block at height 1 this is [Commit::genesis]. Required."))]
    pub seen_commit: Commit,
    #[builder(setter(doc = "Set the execution-layer payload. Required."))]
    pub payload: P,
    #[builder(setter(doc = "Set the hash of the validator set that will commit the new block. Required."))]
    pub validators_hash: CryptoHash,
    #[builder(setter(doc = "Set the number of the epoch the new block belongs to. Required."))]
    pub epoch_number: EpochNumber,
    #[builder(setter(doc = "Set the canonical bytes of the epoch the new block belongs to. Required."))]
    pub epoch_bytes: Vec<u8>,
    #[builder(default, setter(doc = "Set the cross-chain proofs carried by the new block. Defaults to none."))]
    pub cross_chain_proofs: Vec<CrossChainProof>,
    #[builder(default = DEFAULT_PART_SIZE, setter(doc = "Set the size of the parts the new block is split into. Must be greater than 0. Defaults to [DEFAULT_PART_SIZE]."))]
    pub part_size: usize,
}

/// Make a new block from `request`, stamped with the current wall-clock time, and split it into parts.
///
/// The returned block has its seen commit hash filled, so its [hash](BlockEnvelope::hash) can be read
/// concurrently without ever being computed twice.
///
/// Fails only if the payload cannot be encoded.
///
/// # Panics
///
/// Panics if `request.part_size` is 0.
pub fn make_block<P: Payload>(
    request: MakeBlockRequest<P>,
) -> Result<(BlockEnvelope<P>, PartSet), BlockError> {
    let extra = ConsensusExtra::new(
        request.chain_id,
        request.height,
        Timestamp::now(),
        request.epoch_number,
        request.validators_hash,
        Some(request.seen_commit),
        request.epoch_bytes,
    );
    extra.fill_seen_commit_hash();

    let block = BlockEnvelope::new(request.payload, extra, request.cross_chain_proofs);
    let part_set = block.make_part_set(request.part_size)?;

    log_event(&MakeBlockEvent {
        timestamp: SystemTime::now(),
        height: block.extra.height,
        block: block.hash(),
        parts: part_set.header().clone(),
    });

    Ok((block, part_set))
}

impl<P: Payload> BlockEnvelope<P> {
    /// Create a new `BlockEnvelope` with no transient result.
    pub fn new(
        payload: P,
        extra: ConsensusExtra,
        cross_chain_proofs: Vec<CrossChainProof>,
    ) -> BlockEnvelope<P> {
        BlockEnvelope {
            payload,
            extra,
            cross_chain_proofs,
            transient_result: None,
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.extra.height
    }

    pub fn chain_id(&self) -> &ChainID {
        &self.extra.chain_id
    }

    /// Check that this block directly extends the block whose extra is `parent_extra`: it must be on
    /// the same chain, and exactly one higher.
    pub fn validate_basic(&self, parent_extra: &ConsensusExtra) -> Result<(), BlockError> {
        let result = if self.extra.chain_id != parent_extra.chain_id {
            Err(BlockError::ChainMismatch {
                expected: parent_extra.chain_id.clone(),
                actual: self.extra.chain_id.clone(),
            })
        } else if parent_extra.height.checked_next() != Some(self.extra.height) {
            Err(BlockError::HeightMismatch {
                parent: parent_extra.height,
                actual: self.extra.height,
            })
        } else {
            Ok(())
        };

        self.log_rejection(result)
    }

    /// Check that this block's seen commit commits `parent_block_id`.
    ///
    /// Above height 1:
    /// 1. The seen commit must be present, and pass [`Commit::validate_basic`].
    /// 2. It must be for `parent_block_id`, at the height below this block's.
    ///
    /// At every height, a seen commit hash carried in from the wire must equal the hash of the seen
    /// commit.
    pub fn validate_linkage(&self, parent_block_id: &BlockId) -> Result<(), BlockError> {
        let result = self.check_linkage(parent_block_id);
        self.log_rejection(result)
    }

    fn check_linkage(&self, parent_block_id: &BlockId) -> Result<(), BlockError> {
        let height = self.extra.height;

        if let (Some(seen_commit), Some(carried_hash)) =
            (&self.extra.seen_commit, self.extra.seen_commit_hash())
        {
            if *carried_hash != seen_commit.hash() {
                return Err(BlockError::SeenCommitHashMismatch);
            }
        }

        if height.int() <= 1 {
            return Ok(());
        }

        let seen_commit = self
            .extra
            .seen_commit
            .as_ref()
            .ok_or(BlockError::MissingSeenCommit(height))?;
        seen_commit.validate_basic()?;

        if seen_commit.block_id != *parent_block_id {
            return Err(BlockError::ParentMismatch {
                expected: parent_block_id.clone(),
                actual: seen_commit.block_id.clone(),
            });
        }
        let parent_height = BlockHeight::new(height.int() - 1);
        if seen_commit.height != parent_height {
            return Err(BlockError::SeenCommitHeightMismatch {
                expected: parent_height,
                actual: seen_commit.height,
            });
        }

        Ok(())
    }

    /// Get the chain hash of this block, or `None` if the block has no seen commit.
    pub fn hash(&self) -> Option<CryptoHash> {
        self.extra.seen_commit.as_ref()?;
        Some(self.extra.hash())
    }

    /// Get whether this block's hash is `hash`. Always `false` for an empty `hash` or a block without a
    /// hash.
    pub fn hashes_to(&self, hash: &[u8]) -> bool {
        if hash.is_empty() {
            return false;
        }
        self.hash()
            .map_or(false, |block_hash| block_hash.as_bytes().as_slice() == hash)
    }

    /// Get the `BlockId` of this block, when split into the parts described by `parts_header`.
    pub fn block_id(&self, parts_header: &PartSetHeader) -> Option<BlockId> {
        Some(BlockId::new(self.hash()?, parts_header.clone()))
    }

    /// Serialize this block into the bytes that are split into parts.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BlockError> {
        let payload = self
            .payload
            .encode_payload()
            .map_err(BlockError::PayloadEncode)?;
        let block_bytes = BlockBytes {
            payload,
            extra: ConsensusExtraBytes::from(&self.extra),
            cross_chain_proofs: self.cross_chain_proofs.clone(),
        };
        let bytes = encode(&block_bytes)?;

        log_event(&EncodeBlockEvent {
            timestamp: SystemTime::now(),
            height: self.extra.height,
            size: bytes.len(),
        });

        Ok(bytes)
    }

    /// Read a block from `reader`, which must yield exactly the bytes of one serialized block and at
    /// most `config.max_block_size` bytes.
    pub fn from_bytes<R: Read>(
        reader: R,
        config: &BlockConfiguration,
    ) -> Result<BlockEnvelope<P>, BlockError> {
        let result = read_bounded(reader, config.max_block_size)
            .map_err(BlockError::from)
            .and_then(|bytes| Self::decode_block(&bytes, config, false));
        Self::log_decoded(result)
    }

    /// Rebuild a block from a complete `part_set`.
    ///
    /// The reassembled bytes must be the canonical encoding of the block they decode to, so that the
    /// block's parts header really describes the block.
    pub fn from_part_set(
        part_set: &PartSet,
        config: &BlockConfiguration,
    ) -> Result<BlockEnvelope<P>, BlockError> {
        let result = part_set
            .get_reader()
            .map_err(BlockError::from)
            .and_then(|reader| {
                let bytes = read_bounded(reader, config.max_block_size)?;
                Self::decode_block(&bytes, config, true)
            });
        Self::log_decoded(result)
    }

    fn decode_block(
        bytes: &[u8],
        config: &BlockConfiguration,
        canonical: bool,
    ) -> Result<BlockEnvelope<P>, BlockError> {
        let block_bytes: BlockBytes = if canonical {
            decode_canonical(bytes, config.max_block_size)?
        } else {
            decode(bytes, config.max_block_size)?
        };

        let extra = ConsensusExtra::from(block_bytes.extra);
        if let Some(seen_commit) = &extra.seen_commit {
            if !seen_commit.participation.is_well_formed() {
                return Err(CommitError::MalformedParticipation.into());
            }
        }

        let payload = P::decode_payload(&block_bytes.payload).map_err(BlockError::PayloadDecode)?;
        let block = BlockEnvelope::new(payload, extra, block_bytes.cross_chain_proofs);

        log_event(&DecodeBlockEvent {
            timestamp: SystemTime::now(),
            height: block.extra.height,
            block: block.hash(),
            size: bytes.len(),
        });

        Ok(block)
    }

    /// Split this block's serialized bytes into parts of `part_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `part_size` is 0.
    pub fn make_part_set(&self, part_size: usize) -> Result<PartSet, BlockError> {
        let bytes = self.to_bytes()?;
        Ok(PartSet::new_from_data(&bytes, part_size))
    }

    pub fn transient_result(&self) -> Option<&P::Outcome> {
        self.transient_result.as_ref()
    }

    pub fn set_transient_result(&mut self, result: P::Outcome) {
        self.transient_result = Some(result);
    }

    pub fn take_transient_result(&mut self) -> Option<P::Outcome> {
        self.transient_result.take()
    }

    /// Human-readable, multi-line description of the block, each line prefixed by `indent`.
    ///
    /// The payload and the cross-chain proofs are summarized (by the payload's hash and the number of
    /// proofs), so the description stays short however large the block is.
    pub fn string_indented(&self, indent: &str) -> String {
        let seen_commit = match &self.extra.seen_commit {
            Some(commit) => commit.string_indented(&format!("{indent}    ")),
            None => "nil-Commit".to_string(),
        };
        format!(
            "Block{{\n\
             {indent}  {}\n\
             {indent}  SeenCommit: {}\n\
             {indent}  Payload:    {:X}\n\
             {indent}  Proofs:     {}\n\
             {indent}}}#{}",
            self.extra,
            seen_commit,
            self.payload.payload_hash(),
            self.cross_chain_proofs.len(),
            self.hash_string(),
            indent = indent,
        )
    }

    /// One-line description of the block.
    pub fn string_short(&self) -> String {
        format!("Block#{}", self.hash_string())
    }

    fn hash_string(&self) -> String {
        self.hash()
            .map_or_else(|| "nil".to_string(), |hash| format!("{:X}", hash))
    }

    fn log_rejection(&self, result: Result<(), BlockError>) -> Result<(), BlockError> {
        if let Err(err) = &result {
            log_event(&RejectBlockEvent {
                timestamp: SystemTime::now(),
                height: Some(self.extra.height),
                reason: err.to_string(),
            });
        }
        result
    }

    fn log_decoded(
        result: Result<BlockEnvelope<P>, BlockError>,
    ) -> Result<BlockEnvelope<P>, BlockError> {
        if let Err(err) = &result {
            log_event(&RejectBlockEvent {
                timestamp: SystemTime::now(),
                height: None,
                reason: err.to_string(),
            });
        }
        result
    }
}

impl<P: Payload + PartialEq> PartialEq for BlockEnvelope<P> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
            && self.extra == other.extra
            && self.cross_chain_proofs == other.cross_chain_proofs
    }
}

impl<P: Payload> Display for BlockEnvelope<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_indented(""))
    }
}

impl<P: Payload> Debug for BlockEnvelope<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let payload_hash = format!("{:X}", self.payload.payload_hash());
        f.debug_struct("BlockEnvelope")
            .field("extra", &self.extra.to_string())
            .field("payload_hash", &payload_hash)
            .field("cross_chain_proofs", &self.cross_chain_proofs.len())
            .field("hash", &self.hash_string())
            .finish_non_exhaustive()
    }
}

/// The serialized form of a [`BlockEnvelope`]: the payload's own bytes, the consensus extra, and the
/// cross-chain proofs.
#[derive(BorshSerialize, BorshDeserialize)]
struct BlockBytes {
    payload: Vec<u8>,
    extra: ConsensusExtraBytes,
    cross_chain_proofs: Vec<CrossChainProof>,
}

/// The different ways making, reading, or validating a [`BlockEnvelope`] can fail.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block is on chain {actual}, expected chain {expected}")]
    ChainMismatch { expected: ChainID, actual: ChainID },

    #[error("block height {actual} does not directly follow parent height {parent}")]
    HeightMismatch {
        parent: BlockHeight,
        actual: BlockHeight,
    },

    #[error("block at height {0} has no seen commit")]
    MissingSeenCommit(BlockHeight),

    #[error("seen commit is for block {actual}, expected parent {expected}")]
    ParentMismatch { expected: BlockId, actual: BlockId },

    #[error("seen commit is at height {actual}, expected height {expected}")]
    SeenCommitHeightMismatch {
        expected: BlockHeight,
        actual: BlockHeight,
    },

    #[error("carried seen commit hash does not match the seen commit")]
    SeenCommitHashMismatch,

    #[error("could not encode payload: {0}")]
    PayloadEncode(#[source] PayloadError),

    #[error("could not decode payload: {0}")]
    PayloadDecode(#[source] PayloadError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    PartSet(#[from] PartSetError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}
