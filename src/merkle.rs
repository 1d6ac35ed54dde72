/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Binary Merkle trees over sequences of byte strings, and proofs of inclusion in them.
//!
//! ## Tree shape
//!
//! A tree over `n` leaves is built as follows:
//! - `n == 0`: the root is `SHA-256("")`.
//! - `n == 1`: the root is the leaf hash `SHA-256(0x00 ‖ leaf)`.
//! - `n >= 2`: the leaves are split at `k`, the largest power of two strictly less than `n`. The root
//!   is the inner hash `SHA-256(0x01 ‖ root(leaves[..k]) ‖ root(leaves[k..]))`.
//!
//! The split rule puts the "extra" leaves of an odd-sized tree in the right subtree, and is the same on
//! every replica. The `0x00`/`0x01` prefixes keep leaf hashes and inner hashes from ever colliding.
//!
//! ```text
//!   n = 5:          root
//!                  /    \
//!                 o      e
//!               /   \
//!              o     o
//!             / \   / \
//!            a   b c   d
//! ```
//!
//! ## Hashing structured values
//!
//! Structured values (commits, consensus extras) implement [`MerkleFields`] by listing the canonical
//! encodings of their fields in declaration order. Their hash is the root of the tree over those
//! encodings.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{crypto_primitives::sha256, data_types::CryptoHash};

const LEAF_PREFIX: [u8; 1] = [0x00];
const INNER_PREFIX: [u8; 1] = [0x01];

/// Hash of a single leaf.
pub fn leaf_hash(leaf: &[u8]) -> CryptoHash {
    sha256([&LEAF_PREFIX[..], leaf])
}

/// Hash of an inner node with children `left` and `right`.
pub fn inner_hash(left: &CryptoHash, right: &CryptoHash) -> CryptoHash {
    sha256([&INNER_PREFIX[..], left.as_ref(), right.as_ref()])
}

/// Root of the tree with no leaves.
pub fn empty_hash() -> CryptoHash {
    sha256(std::iter::empty::<&[u8]>())
}

/// Compute the Merkle root of `leaves`.
pub fn hash_from_leaves<T: AsRef<[u8]>>(leaves: &[T]) -> CryptoHash {
    let hashes: Vec<CryptoHash> = leaves.iter().map(|leaf| leaf_hash(leaf.as_ref())).collect();
    root_of_hashes(&hashes)
}

/// Compute the Merkle root of `leaves`, along with a proof of inclusion for every leaf.
///
/// Every node of the tree is hashed once, however many proofs are produced.
pub fn proofs_from_leaves<T: AsRef<[u8]>>(leaves: &[T]) -> (CryptoHash, Vec<MerkleProof>) {
    let hashes: Vec<CryptoHash> = leaves.iter().map(|leaf| leaf_hash(leaf.as_ref())).collect();
    let mut aunts = vec![Vec::new(); hashes.len()];
    let root = root_with_aunts(&hashes, &mut aunts);

    let total = hashes.len() as u32;
    let proofs = hashes
        .into_iter()
        .zip(aunts)
        .enumerate()
        .map(|(index, (leaf_hash, aunts))| MerkleProof {
            total,
            index: index as u32,
            leaf_hash,
            aunts,
        })
        .collect();

    (root, proofs)
}

/// Produce a proof that `leaves[index]` is included in the tree over `leaves`, or `None` if `index` is
/// out of range.
pub fn prove_leaf<T: AsRef<[u8]>>(leaves: &[T], index: usize) -> Option<MerkleProof> {
    if index >= leaves.len() {
        return None;
    }

    let hashes: Vec<CryptoHash> = leaves.iter().map(|leaf| leaf_hash(leaf.as_ref())).collect();
    let mut aunts = Vec::new();
    collect_aunts(&hashes, index, &mut aunts);
    Some(MerkleProof {
        total: hashes.len() as u32,
        index: index as u32,
        leaf_hash: hashes[index],
        aunts,
    })
}

/// Values whose hash is the Merkle root over the canonical encodings of their fields.
pub trait MerkleFields {
    /// Canonical encodings of the fields that identify the value, in declaration order.
    fn merkle_fields(&self) -> Vec<Vec<u8>>;

    /// Merkle root over [`merkle_fields`](Self::merkle_fields).
    fn merkle_hash(&self) -> CryptoHash {
        hash_from_leaves(&self.merkle_fields())
    }
}

/// Proof that a leaf with hash `leaf_hash` sits at position `index` of a tree with `total` leaves.
///
/// `aunts` are the sibling hashes on the path from the leaf up to the root, ordered from the one
/// closest to the leaf to the one closest to the root.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MerkleProof {
    pub total: u32,
    pub index: u32,
    pub leaf_hash: CryptoHash,
    pub aunts: Vec<CryptoHash>,
}

impl MerkleProof {
    /// Compute the root implied by this proof, or `None` if the proof's shape does not fit a tree of
    /// `total` leaves.
    pub fn compute_root_hash(&self) -> Option<CryptoHash> {
        root_from_aunts(self.index, self.total, self.leaf_hash, &self.aunts)
    }

    /// Check that `leaf` sits at `self.index` of the tree whose root is `root`.
    pub fn verify(&self, root: &CryptoHash, leaf: &[u8]) -> Result<(), MerkleProofError> {
        if self.index >= self.total {
            return Err(MerkleProofError::IndexOutOfBounds {
                index: self.index,
                total: self.total,
            });
        }
        if leaf_hash(leaf) != self.leaf_hash {
            return Err(MerkleProofError::LeafHashMismatch);
        }
        match self.compute_root_hash() {
            None => Err(MerkleProofError::UnexpectedProofLength {
                total: self.total,
                index: self.index,
                actual_proof_length: self.aunts.len(),
            }),
            Some(computed) if computed != *root => Err(MerkleProofError::RootMismatch),
            Some(_) => Ok(()),
        }
    }

    /// Like [`verify`](Self::verify), but also check that the proof is for position `index` of a tree
    /// with `total` leaves.
    pub fn verify_at(
        &self,
        total: u32,
        index: u32,
        root: &CryptoHash,
        leaf: &[u8],
    ) -> Result<(), MerkleProofError> {
        if self.total != total || self.index != index {
            return Err(MerkleProofError::PositionMismatch {
                expected_total: total,
                expected_index: index,
                total: self.total,
                index: self.index,
            });
        }
        self.verify(root, leaf)
    }
}

/// The different ways verifying a [`MerkleProof`] can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleProofError {
    #[error("index out of bounds. Total: {total}, index: {index}")]
    IndexOutOfBounds { total: u32, index: u32 },

    #[error(
        "unexpected proof length. Total: {total}, index: {index}, \
         actual proof length: {actual_proof_length}"
    )]
    UnexpectedProofLength {
        total: u32,
        index: u32,
        actual_proof_length: usize,
    },

    #[error(
        "proof is for leaf {index} of {total}, expected leaf {expected_index} of {expected_total}"
    )]
    PositionMismatch {
        expected_total: u32,
        expected_index: u32,
        total: u32,
        index: u32,
    },

    #[error("leaf does not hash to the proof's leaf hash")]
    LeafHashMismatch,

    #[error("proof does not lead to the expected root")]
    RootMismatch,
}

/// Number of leaves that go into the left subtree of a tree with `n >= 2` leaves: the largest power of
/// two strictly less than `n`.
fn split_point(n: usize) -> usize {
    debug_assert!(n >= 2);
    1 << (usize::BITS - 1 - (n - 1).leading_zeros())
}

fn root_of_hashes(hashes: &[CryptoHash]) -> CryptoHash {
    match hashes.len() {
        0 => empty_hash(),
        1 => hashes[0],
        n => {
            let k = split_point(n);
            inner_hash(&root_of_hashes(&hashes[..k]), &root_of_hashes(&hashes[k..]))
        }
    }
}

// Compute the root of `hashes`, pushing onto `aunts[i]` the sibling hashes on the path from leaf `i`
// up to that root.
fn root_with_aunts(hashes: &[CryptoHash], aunts: &mut [Vec<CryptoHash>]) -> CryptoHash {
    match hashes.len() {
        0 => empty_hash(),
        1 => hashes[0],
        n => {
            let k = split_point(n);
            let (left_aunts, right_aunts) = aunts.split_at_mut(k);
            let left = root_with_aunts(&hashes[..k], left_aunts);
            let right = root_with_aunts(&hashes[k..], right_aunts);
            left_aunts.iter_mut().for_each(|path| path.push(right));
            right_aunts.iter_mut().for_each(|path| path.push(left));
            inner_hash(&left, &right)
        }
    }
}

fn collect_aunts(hashes: &[CryptoHash], index: usize, aunts: &mut Vec<CryptoHash>) {
    let n = hashes.len();
    if n <= 1 {
        return;
    }

    let k = split_point(n);
    if index < k {
        collect_aunts(&hashes[..k], index, aunts);
        aunts.push(root_of_hashes(&hashes[k..]));
    } else {
        collect_aunts(&hashes[k..], index - k, aunts);
        aunts.push(root_of_hashes(&hashes[..k]));
    }
}

fn root_from_aunts(
    index: u32,
    total: u32,
    leaf_hash: CryptoHash,
    aunts: &[CryptoHash],
) -> Option<CryptoHash> {
    if index >= total {
        return None;
    }

    match total {
        1 => aunts.is_empty().then_some(leaf_hash),
        _ => {
            let (last, rest) = aunts.split_last()?;
            let k = split_point(total as usize) as u32;
            if index < k {
                let left = root_from_aunts(index, k, leaf_hash, rest)?;
                Some(inner_hash(&left, last))
            } else {
                let right = root_from_aunts(index - k, total - k, leaf_hash, rest)?;
                Some(inner_hash(last, &right))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| vec![i as u8; i + 1]).collect()
    }

    #[test]
    fn split_point_is_largest_power_of_two_below_n() {
        let expected = [(2, 1), (3, 2), (4, 2), (5, 4), (8, 4), (9, 8), (100, 64)];
        for (n, k) in expected {
            assert_eq!(split_point(n), k, "n = {}", n);
        }
    }

    #[test]
    fn sha256_of_empty_input_is_known() {
        assert_eq!(
            format!("{:X}", empty_hash()),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn single_leaf_root_is_its_leaf_hash() {
        let leaves = leaves(1);
        assert_eq!(hash_from_leaves(&leaves), leaf_hash(&leaves[0]));
    }

    #[test]
    fn three_leaves_put_the_odd_leaf_on_the_right() {
        let leaves = leaves(3);
        let left = inner_hash(&leaf_hash(&leaves[0]), &leaf_hash(&leaves[1]));
        let expected = inner_hash(&left, &leaf_hash(&leaves[2]));
        assert_eq!(hash_from_leaves(&leaves), expected);
    }

    #[test]
    fn every_proof_verifies_for_every_tree_size() {
        for n in 1..=33 {
            let leaves = leaves(n);
            let (root, proofs) = proofs_from_leaves(&leaves);
            assert_eq!(root, hash_from_leaves(&leaves));
            for (leaf, proof) in leaves.iter().zip(proofs.iter()) {
                assert_eq!(proof.verify(&root, leaf), Ok(()));
                assert_eq!(Some(proof), prove_leaf(&leaves, proof.index as usize).as_ref());
            }
        }
    }

    #[test]
    fn proofs_for_many_leaves_match_single_leaf_proofs() {
        let leaves: Vec<[u8; 4]> = (0..5000u32).map(u32::to_le_bytes).collect();
        let (root, proofs) = proofs_from_leaves(&leaves);
        assert_eq!(proofs.len(), 5000);
        for index in [0, 1, 2047, 4095, 4096, 4999] {
            assert_eq!(Some(&proofs[index]), prove_leaf(&leaves, index).as_ref());
            assert_eq!(proofs[index].verify(&root, &leaves[index]), Ok(()));
        }
    }

    #[test]
    fn proof_for_another_leaf_does_not_verify() {
        let leaves = leaves(6);
        let (root, proofs) = proofs_from_leaves(&leaves);
        assert_eq!(
            proofs[2].verify(&root, &leaves[3]),
            Err(MerkleProofError::LeafHashMismatch)
        );
    }

    #[test]
    fn tampered_aunt_does_not_verify() {
        let leaves = leaves(7);
        let (root, mut proofs) = proofs_from_leaves(&leaves);
        proofs[4].aunts[0] = leaf_hash(b"forged");
        assert_eq!(
            proofs[4].verify(&root, &leaves[4]),
            Err(MerkleProofError::RootMismatch)
        );
    }

    #[test]
    fn truncated_proof_does_not_verify() {
        let leaves = leaves(5);
        let (root, mut proofs) = proofs_from_leaves(&leaves);
        proofs[0].aunts.pop();
        assert!(matches!(
            proofs[0].verify(&root, &leaves[0]),
            Err(MerkleProofError::UnexpectedProofLength { .. })
        ));
    }

    #[test]
    fn out_of_range_leaf_has_no_proof() {
        assert!(prove_leaf(&leaves(4), 4).is_none());
        assert!(prove_leaf::<Vec<u8>>(&[], 0).is_none());
    }
}
