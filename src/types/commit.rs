/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Commit`]: evidence that a quorum of validators precommitted a block.
//!
//! A commit stores the *output* of the validator set's signature aggregation scheme: one aggregated
//! signature, plus a [`BitArray`] saying which validators' signatures went into it. Checking the
//! aggregate itself is delegated to an [`AggregateSignatureVerifier`] supplied by the caller; this
//! module checks everything else (structure, participation size, voting power).

use std::sync::OnceLock;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{codec::canonical_bytes, merkle::MerkleFields};

use super::{
    bit_array::BitArray,
    block_id::BlockId,
    data_types::{
        BlockHeight, ChainID, CryptoHash, PublicKeyBytes, Round, SignatureAggregate, TotalPower,
    },
    validator_set::ValidatorSet,
};

/// Kinds of votes that validators sign. Commits are always formed from precommits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
#[repr(u8)]
pub enum VoteType {
    Prevote = 1,
    Precommit = 2,
}

/// Checks aggregated signatures produced by a validator set.
///
/// Implemented by the owner of the validator set's signature scheme (e.g., BLS). This crate never
/// inspects aggregate signature bytes itself.
pub trait AggregateSignatureVerifier {
    /// Check that `signature` is a valid aggregate, by exactly the validators with `signers`, of their
    /// individual signatures over `message`.
    fn verify_aggregate(
        &self,
        message: &[u8],
        signers: &[&PublicKeyBytes],
        signature: &SignatureAggregate,
    ) -> bool;
}

/// Evidence that the validators marked in `participation` precommitted `block_id` at `height` and
/// `round`.
///
/// ## Hash
///
/// A commit's [`hash`](Self::hash) is computed on first use and cached. The cache is a [`OnceLock`],
/// so a commit shared between threads through `&Commit` computes it at most once, and every caller
/// observes the same value. A commit is never mutated after construction, so the cache is never
/// invalidated. The cache is not part of the commit's encoding and is ignored by `==`.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct Commit {
    pub block_id: BlockId,
    pub height: BlockHeight,
    pub round: Round,
    pub signature_aggregate: SignatureAggregate,
    pub participation: BitArray,
    #[borsh_skip]
    hash: OnceLock<CryptoHash>,
}

impl Commit {
    /// Create a new `Commit`.
    ///
    /// `participation` must be sized to the number of validators in the validator set that formed the
    /// commit.
    pub fn new(
        block_id: BlockId,
        height: BlockHeight,
        round: Round,
        signature_aggregate: SignatureAggregate,
        participation: BitArray,
    ) -> Commit {
        Commit {
            block_id,
            height,
            round,
            signature_aggregate,
            participation,
            hash: OnceLock::new(),
        }
    }

    /// Create the commit that blocks at height 1 carry as their seen commit.
    ///
    /// It refers to the zero `BlockId` at height 0, has an empty aggregate and an empty participation
    /// set. It is present so that height-1 blocks have a chain hash, but it never passes
    /// [`validate_basic`](Self::validate_basic).
    pub fn genesis() -> Commit {
        Commit::new(
            BlockId::zero(),
            BlockHeight::new(0),
            Round::new(0),
            SignatureAggregate::default(),
            BitArray::empty(),
        )
    }

    /// Get the kind of votes this commit aggregates.
    pub fn vote_type(&self) -> VoteType {
        VoteType::Precommit
    }

    /// Get the number of validators that could have participated (the size of the validator set).
    pub fn size(&self) -> u32 {
        self.participation.size()
    }

    /// Get the number of validators that participated.
    pub fn num_commits(&self) -> u32 {
        self.participation.num_bits_set()
    }

    /// Check the commit's structure, without reference to any validator set.
    pub fn validate_basic(&self) -> Result<(), CommitError> {
        if self.block_id.is_zero() {
            return Err(CommitError::InvalidCommit);
        }
        if !self.participation.is_well_formed() {
            return Err(CommitError::MalformedParticipation);
        }
        Ok(())
    }

    /// Get the hash of this commit, computing and caching it on first call.
    pub fn hash(&self) -> CryptoHash {
        *self.hash.get_or_init(|| self.merkle_hash())
    }

    /// Get the cached hash, if [`hash`](Self::hash) has been called.
    pub fn cached_hash(&self) -> Option<&CryptoHash> {
        self.hash.get()
    }

    /// Get the bytes that each participating validator signed, and over which `signature_aggregate`
    /// aggregates: the chain id, vote type, height and round, followed by the
    /// [sign bytes](BlockId::sign_bytes) of `block_id`.
    pub fn sign_bytes(&self, chain_id: &ChainID) -> Vec<u8> {
        let mut bytes = canonical_bytes(&(
            chain_id.clone(),
            self.vote_type() as u8,
            self.height,
            self.round,
        ));
        bytes.extend(self.block_id.sign_bytes());
        bytes
    }

    /// Sum the powers of the validators in `validator_set` that participated in this commit.
    pub fn voting_power(&self, validator_set: &ValidatorSet) -> TotalPower {
        let mut total_power = TotalPower::new(0);
        for pos in self.participation.iter_set() {
            if let Some(validator) = validator_set.get(pos as usize) {
                total_power += validator.power;
            }
        }
        total_power
    }

    /// Check that this commit is valid evidence that a quorum of `validator_set` precommitted
    /// `block_id` on the chain `chain_id`.
    ///
    /// Callers must pass the validator set that was active at `self.height`, whose hash is the
    /// `validators_hash` of the block being committed.
    pub fn verify<V: AggregateSignatureVerifier>(
        &self,
        chain_id: &ChainID,
        validator_set: &ValidatorSet,
        verifier: &V,
    ) -> Result<(), CommitError> {
        self.validate_basic()?;

        if self.size() as usize != validator_set.len() {
            return Err(CommitError::ParticipationSizeMismatch {
                expected: validator_set.len(),
                actual: self.size(),
            });
        }

        let power = self.voting_power(validator_set);
        let quorum = validator_set.quorum();
        if power < quorum {
            return Err(CommitError::InsufficientPower {
                power: power.int(),
                quorum: quorum.int(),
            });
        }

        let signers: Vec<&PublicKeyBytes> = self
            .participation
            .iter_set()
            .filter_map(|pos| validator_set.get(pos as usize))
            .map(|validator| &validator.public_key)
            .collect();
        if !verifier.verify_aggregate(
            &self.sign_bytes(chain_id),
            &signers,
            &self.signature_aggregate,
        ) {
            return Err(CommitError::InvalidSignature);
        }

        Ok(())
    }

    /// Human-readable, multi-line description of the commit, each line prefixed by `indent`.
    pub fn string_indented(&self, indent: &str) -> String {
        format!(
            "Commit{{\n\
             {indent}  BlockID:    {}\n\
             {indent}  Height:     {}\n\
             {indent}  Round:      {}\n\
             {indent}  Type:       {:?}\n\
             {indent}  BitArray:   {}\n\
             {indent}}}#{}",
            self.block_id,
            self.height,
            self.round,
            self.vote_type(),
            self.participation,
            self.hash(),
            indent = indent,
        )
    }
}

impl MerkleFields for Commit {
    fn merkle_fields(&self) -> Vec<Vec<u8>> {
        vec![
            canonical_bytes(&self.block_id),
            canonical_bytes(&self.height),
            canonical_bytes(&self.round),
            canonical_bytes(&self.signature_aggregate),
            canonical_bytes(&self.participation),
        ]
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.block_id == other.block_id
            && self.height == other.height
            && self.round == other.round
            && self.signature_aggregate == other.signature_aggregate
            && self.participation == other.participation
    }
}

impl Eq for Commit {}

/// The different ways a [`Commit`] can fail validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    /// The commit refers to the zero `BlockId`.
    #[error("commit cannot be for a zero block id")]
    InvalidCommit,

    /// The participation bit array is not in canonical form.
    #[error("commit participation bit array is malformed")]
    MalformedParticipation,

    /// The participation bit array is not sized to the validator set.
    #[error("commit participation has {actual} bits, validator set has {expected} validators")]
    ParticipationSizeMismatch { expected: usize, actual: u32 },

    /// The participating validators do not hold a quorum of the validator set's power.
    #[error("commit carries power {power}, quorum is {quorum}")]
    InsufficientPower { power: u128, quorum: u128 },

    /// The aggregated signature does not verify.
    #[error("commit aggregate signature is invalid")]
    InvalidSignature,
}
