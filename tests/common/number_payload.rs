//! [`NumberPayload`], a simple implementation of [`Payload`] used in the integration tests, and the
//! helpers that make chains of blocks carrying it.

use borsh::{BorshDeserialize, BorshSerialize};
use bft_finality::{
    config::DEFAULT_PART_SIZE,
    types::{
        block::{make_block, BlockEnvelope, MakeBlockRequest},
        commit::Commit,
        crypto_primitives::{CryptoHasher, Digest},
        data_types::{BlockHeight, ChainID, CryptoHash, EpochNumber},
        part_set::PartSet,
        payload::{Payload, PayloadError},
        validator_set::ValidatorSet,
    },
};

use crate::common::validators::commit_for;

pub(crate) const CHAIN_ID: &str = "number-chain";

/// A payload that is a list of numbers. Executing it sums the numbers.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub(crate) struct NumberPayload {
    pub(crate) numbers: Vec<u64>,
}

impl NumberPayload {
    pub(crate) fn new(numbers: Vec<u64>) -> NumberPayload {
        NumberPayload { numbers }
    }

    pub(crate) fn sum(&self) -> u64 {
        self.numbers.iter().sum()
    }
}

impl Payload for NumberPayload {
    type Outcome = u64;

    fn encode_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(self.try_to_vec()?)
    }

    fn decode_payload(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(NumberPayload::try_from_slice(bytes)?)
    }

    fn payload_hash(&self) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        for number in &self.numbers {
            hasher.update(number.to_le_bytes());
        }
        CryptoHash::new(hasher.finalize().into())
    }
}

/// A payload that can never be encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UnencodablePayload;

impl Payload for UnencodablePayload {
    type Outcome = ();

    fn encode_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Err("unencodable payload".into())
    }

    fn decode_payload(_bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(UnencodablePayload)
    }

    fn payload_hash(&self) -> CryptoHash {
        CryptoHash::new([0; 32])
    }
}

pub(crate) fn chain_id() -> ChainID {
    ChainID::new(CHAIN_ID)
}

/// Make the block at height 1, which carries the genesis commit.
pub(crate) fn make_first_block(
    validator_set: &ValidatorSet,
    numbers: Vec<u64>,
    part_size: usize,
) -> (BlockEnvelope<NumberPayload>, PartSet) {
    make_block(
        MakeBlockRequest::builder()
            .height(BlockHeight::new(1))
            .chain_id(chain_id())
            .seen_commit(Commit::genesis())
            .payload(NumberPayload::new(numbers))
            .validators_hash(validator_set.hash())
            .epoch_number(EpochNumber::new(0))
            .epoch_bytes(vec![0])
            .part_size(part_size)
            .build(),
    )
    .unwrap()
}

/// Make the block that directly extends `parent`, carrying a commit for `parent` signed by the
/// validators at `signers`.
pub(crate) fn make_child_block(
    parent: &BlockEnvelope<NumberPayload>,
    parent_part_set: &PartSet,
    validator_set: &ValidatorSet,
    signers: &[usize],
    numbers: Vec<u64>,
) -> (BlockEnvelope<NumberPayload>, PartSet) {
    let parent_block_id = parent.block_id(parent_part_set.header()).unwrap();
    let seen_commit = commit_for(&parent_block_id, parent.height(), validator_set, signers);
    make_block(
        MakeBlockRequest::builder()
            .height(parent.height() + 1)
            .chain_id(chain_id())
            .seen_commit(seen_commit)
            .payload(NumberPayload::new(numbers))
            .validators_hash(validator_set.hash())
            .epoch_number(EpochNumber::new(0))
            .epoch_bytes(vec![0])
            .part_size(DEFAULT_PART_SIZE)
            .build(),
    )
    .unwrap()
}
