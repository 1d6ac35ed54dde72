/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Splitting serialized blocks into Merkle-provable [`Part`]s, and reassembling them.
//!
//! ## Sending
//!
//! The proposer of a block calls [`PartSet::new_from_data`] on the block's serialized bytes. This cuts
//! the bytes into `part_size` chunks, computes the Merkle root over the chunks (the
//! [`PartSetHeader`]'s `hash`), and attaches to every part a proof of its position under that root.
//!
//! ## Receiving
//!
//! A replica that learns a block's [`BlockId`](super::block_id::BlockId) creates an empty set with
//! [`PartSet::new_from_header`] and feeds it parts as they arrive, from any peer and in any order, with
//! [`PartSet::add_part`]. Each part is checked against the header before it is admitted, so a complete
//! part set always reassembles into exactly the bytes the header commits to.
//!
//! `add_part` takes `&mut self`. A replica receiving from several peers at once shares the set as an
//! `Arc<Mutex<PartSet>>` (or gives it a single owner that others send parts to).

use std::{io::Cursor, time::SystemTime};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    config::BlockConfiguration,
    events::{AddPartEvent, CompletePartSetEvent, RejectPartEvent},
    logging::log_event,
    merkle::{leaf_hash, proofs_from_leaves, MerkleProof, MerkleProofError},
};

use super::{bit_array::BitArray, block_id::PartSetHeader, data_types::CryptoHash};

/// A chunk of a serialized block, with a proof of its position in the block's part set.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Part {
    pub index: u32,
    pub bytes: Vec<u8>,
    pub proof: MerkleProof,
}

impl Part {
    /// Get the Merkle leaf hash of this part's bytes.
    pub fn hash(&self) -> CryptoHash {
        leaf_hash(&self.bytes)
    }
}

/// A serialized block split into parts, either fully (on the proposer) or partially received (on
/// every other replica).
#[derive(Clone, Debug)]
pub struct PartSet {
    header: PartSetHeader,
    part_size: usize,
    parts: Vec<Option<Part>>,
    parts_present: BitArray,
    count: u32,
    byte_size: usize,
}

impl PartSet {
    /// Split `data` into parts of `part_size` bytes. The last part holds the remainder and may be
    /// shorter.
    ///
    /// Empty `data` makes a part set with no parts and the zero [`PartSetHeader`].
    ///
    /// # Panics
    ///
    /// Panics if `part_size` is 0, or if `data` would be split into more than `u32::MAX` parts.
    pub fn new_from_data(data: &[u8], part_size: usize) -> PartSet {
        assert!(part_size > 0, "part size must be greater than 0");

        let chunks: Vec<&[u8]> = data.chunks(part_size).collect();
        let total = u32::try_from(chunks.len()).expect("data splits into at most u32::MAX parts");
        if total == 0 {
            return PartSet {
                header: PartSetHeader::zero(),
                part_size,
                parts: Vec::new(),
                parts_present: BitArray::empty(),
                count: 0,
                byte_size: 0,
            };
        }

        let (root, proofs) = proofs_from_leaves(&chunks);
        let parts: Vec<Option<Part>> = chunks
            .into_iter()
            .zip(proofs)
            .map(|(chunk, proof)| {
                Some(Part {
                    index: proof.index,
                    bytes: chunk.to_vec(),
                    proof,
                })
            })
            .collect();

        let mut parts_present = BitArray::new(total);
        for index in 0..total {
            parts_present.set(index, true);
        }

        PartSet {
            header: PartSetHeader::new(total, root),
            part_size,
            parts,
            parts_present,
            count: total,
            byte_size: data.len(),
        }
    }

    /// Create an empty part set that admits the parts described by `header`, each at most
    /// `config.part_size` bytes long.
    ///
    /// `header` usually comes from a peer, so it is checked before anything is allocated for it:
    /// 1. A header with parts must carry their Merkle root ([`PartSetError::MissingHash`]).
    /// 2. It must describe no more parts than a block of `config.max_block_size` bytes splits into
    ///    ([`PartSetError::TooManyParts`]).
    ///
    /// # Panics
    ///
    /// Panics if `config.part_size` is 0.
    pub fn new_from_header(
        header: PartSetHeader,
        config: &BlockConfiguration,
    ) -> Result<PartSet, PartSetError> {
        assert!(config.part_size > 0, "part size must be greater than 0");

        let total = header.total;
        if total > 0 && header.hash.is_none() {
            return Err(PartSetError::MissingHash { total });
        }
        let max = max_parts(config);
        if u64::from(total) > max {
            return Err(PartSetError::TooManyParts { total, max });
        }

        Ok(PartSet {
            header,
            part_size: config.part_size,
            parts: vec![None; total as usize],
            parts_present: BitArray::new(total),
            count: 0,
            byte_size: 0,
        })
    }

    /// Admit `part` into the set.
    ///
    /// The part is rejected, and the set left unchanged, if any of the following checks fails (in this
    /// order):
    /// 1. Its index is less than the header's `total` ([`PartSetError::IndexOutOfRange`]).
    /// 2. It is no larger than the part size ([`PartSetError::PartTooLarge`]).
    /// 3. No part with the same index has been admitted ([`PartSetError::DuplicatePart`]).
    /// 4. Its proof places its bytes at its index under the header's hash
    ///    ([`PartSetError::InvalidProof`]).
    pub fn add_part(&mut self, part: Part) -> Result<(), PartSetError> {
        let index = part.index;
        if let Err(err) = self.check_part(&part) {
            log_event(&RejectPartEvent {
                timestamp: SystemTime::now(),
                index,
                reason: err.to_string(),
            });
            return Err(err);
        }

        self.byte_size += part.bytes.len();
        self.parts[index as usize] = Some(part);
        self.parts_present.set(index, true);
        self.count += 1;

        log_event(&AddPartEvent {
            timestamp: SystemTime::now(),
            index,
            count: self.count,
            total: self.header.total,
        });
        if self.is_complete() {
            log_event(&CompletePartSetEvent {
                timestamp: SystemTime::now(),
                parts: self.header.clone(),
                byte_size: self.byte_size,
            });
        }

        Ok(())
    }

    fn check_part(&self, part: &Part) -> Result<(), PartSetError> {
        let total = self.header.total;
        if part.index >= total {
            return Err(PartSetError::IndexOutOfRange {
                index: part.index,
                total,
            });
        }
        if part.bytes.len() > self.part_size {
            return Err(PartSetError::PartTooLarge {
                len: part.bytes.len(),
                max: self.part_size,
            });
        }
        if self.parts_present.get(part.index) {
            return Err(PartSetError::DuplicatePart(part.index));
        }

        let root = self.header.hash.ok_or(PartSetError::InvalidProof {
            index: part.index,
            source: MerkleProofError::RootMismatch,
        })?;
        part.proof
            .verify_at(total, part.index, &root, &part.bytes)
            .map_err(|source| PartSetError::InvalidProof {
                index: part.index,
                source,
            })
    }

    /// Get whether every part described by the header has been admitted.
    pub fn is_complete(&self) -> bool {
        self.count == self.header.total
    }

    /// Get a reader over the concatenated bytes of every part, in index order.
    pub fn get_reader(&self) -> Result<Cursor<Vec<u8>>, PartSetError> {
        if !self.is_complete() {
            return Err(PartSetError::IncompleteData {
                count: self.count,
                total: self.header.total,
            });
        }

        let mut data = Vec::with_capacity(self.byte_size);
        for part in self.parts.iter().flatten() {
            data.extend_from_slice(&part.bytes);
        }
        Ok(Cursor::new(data))
    }

    /// Get the part at `index`, if it has been admitted.
    pub fn get_part(&self, index: u32) -> Option<&Part> {
        self.parts.get(index as usize)?.as_ref()
    }

    /// Iterate through the admitted parts in index order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> + '_ {
        self.parts.iter().flatten()
    }

    /// Get which parts have been admitted.
    pub fn parts_bit_array(&self) -> &BitArray {
        &self.parts_present
    }

    /// Get the number of admitted parts.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn total(&self) -> u32 {
        self.header.total
    }

    /// Get the total length of the admitted parts' bytes.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    pub fn header(&self) -> &PartSetHeader {
        &self.header
    }

    /// Get whether this set was made for `header`.
    pub fn has_header(&self, header: &PartSetHeader) -> bool {
        self.header.equals(header)
    }
}

/// Number of parts a block of at most `config.max_block_size` bytes splits into.
fn max_parts(config: &BlockConfiguration) -> u64 {
    (config.max_block_size as u64).div_ceil(config.part_size as u64)
}

/// The different ways creating, admitting a part into, or reading from, a [`PartSet`] can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartSetError {
    #[error("part set header of {total} parts has no hash")]
    MissingHash { total: u32 },

    #[error("part set header of {total} parts exceeds the limit of {max} parts")]
    TooManyParts { total: u32, max: u64 },

    #[error("part index {index} out of range for a part set of {total} parts")]
    IndexOutOfRange { index: u32, total: u32 },

    #[error("part of {len} bytes exceeds the part size of {max} bytes")]
    PartTooLarge { len: usize, max: usize },

    #[error("part {0} has already been added")]
    DuplicatePart(u32),

    #[error("part {index} has an invalid proof: {source}")]
    InvalidProof {
        index: u32,
        source: MerkleProofError,
    },

    #[error("part set holds {count} of {total} parts")]
    IncompleteData { count: u32, total: u32 },
}
