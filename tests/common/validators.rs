//! A mock validator set, and a mock signature aggregation scheme to form commits with.
//!
//! The mock "aggregate signature" of a group of validators over a message is the SHA-256 digest of the
//! message followed by the validators' public keys, in validator set order. It is trivially forgeable,
//! but it is deterministic and depends on exactly the inputs a real aggregate depends on.

use bft_finality::types::{
    bit_array::BitArray,
    block_id::BlockId,
    commit::{AggregateSignatureVerifier, Commit},
    crypto_primitives::{CryptoHasher, Digest},
    data_types::{BlockHeight, Power, PublicKeyBytes, Round, SignatureAggregate},
    validator_set::ValidatorSet,
};

use crate::common::number_payload::chain_id;

/// Create a validator set of `n` validators, each with power 1.
pub(crate) fn validator_set(n: u8) -> ValidatorSet {
    (0..n)
        .map(|i| (PublicKeyBytes::new(vec![i; 48]), Power::new(1)))
        .collect()
}

pub(crate) struct MockVerifier;

impl MockVerifier {
    pub(crate) fn aggregate(message: &[u8], signers: &[&PublicKeyBytes]) -> SignatureAggregate {
        let mut hasher = CryptoHasher::new();
        hasher.update(message);
        for signer in signers {
            hasher.update(signer.bytes());
        }
        SignatureAggregate::new(hasher.finalize().to_vec())
    }
}

impl AggregateSignatureVerifier for MockVerifier {
    fn verify_aggregate(
        &self,
        message: &[u8],
        signers: &[&PublicKeyBytes],
        signature: &SignatureAggregate,
    ) -> bool {
        MockVerifier::aggregate(message, signers) == *signature
    }
}

/// Form a commit, in round 0, for `block_id` at `height`, signed by the validators at positions
/// `signers` of `validator_set`.
pub(crate) fn commit_for(
    block_id: &BlockId,
    height: BlockHeight,
    validator_set: &ValidatorSet,
    signers: &[usize],
) -> Commit {
    let mut participation = BitArray::new(validator_set.len() as u32);
    for signer in signers {
        participation.set(*signer as u32, true);
    }

    let unsigned = Commit::new(
        block_id.clone(),
        height,
        Round::new(0),
        SignatureAggregate::default(),
        participation.clone(),
    );
    let signer_keys: Vec<&PublicKeyBytes> = participation
        .iter_set()
        .filter_map(|signer| validator_set.get(signer as usize))
        .map(|validator| &validator.public_key)
        .collect();
    let signature_aggregate =
        MockVerifier::aggregate(&unsigned.sign_bytes(&chain_id()), &signer_keys);

    Commit::new(
        block_id.clone(),
        height,
        Round::new(0),
        signature_aggregate,
        participation,
    )
}
