/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store information about the validator set that forms commits.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{codec::canonical_bytes, merkle::hash_from_leaves};

use super::data_types::{CryptoHash, Power, PublicKeyBytes, TotalPower};

/// A validator's identity and voting power.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    pub public_key: PublicKeyBytes,
    pub power: Power,
}

/// Stores the identities of validators and their voting powers.
///
/// ## Ordering of validators
///
/// `ValidatorSet` internally maintains the list of validators in ascending order of their public key
/// bytes. The position of a validator in this order is the index of its bit in the participation
/// [`BitArray`](super::bit_array::BitArray) of every [`Commit`](super::commit::Commit) formed by the set.
///
/// ## Limits to total power
///
/// Users must make sure that the total power of the validator set does not exceed `u128::MAX/2`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    // Sorted in ascending order of `public_key`.
    validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Create an empty validator set.
    pub fn new() -> ValidatorSet {
        Self {
            validators: Vec::new(),
        }
    }

    /// Put a validator with `public_key` and `power` into the validator set, placing it in a position
    /// that preserves the [ordering of validators](Self#ordering-of-validators).
    ///
    /// If the validator already exists in the validator set, this function updates its power instead.
    pub fn put(&mut self, public_key: PublicKeyBytes, power: Power) {
        match self
            .validators
            .binary_search_by(|v| v.public_key.cmp(&public_key))
        {
            Ok(pos) => self.validators[pos].power = power,
            Err(insert_pos) => self
                .validators
                .insert(insert_pos, Validator { public_key, power }),
        }
    }

    /// Get the sum of the powers of all of the validators inside the validator set.
    pub fn total_power(&self) -> TotalPower {
        let mut total_power = TotalPower::new(0);
        for validator in &self.validators {
            total_power += validator.power
        }
        total_power
    }

    /// Get the validator at `pos` in the [ordering of validators](Self#ordering-of-validators).
    pub fn get(&self, pos: usize) -> Option<&Validator> {
        self.validators.get(pos)
    }

    /// Get the number of validators currently in the validator set.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check whether the validator set is empty (i.e., `self.len() == 0`).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the index of the validator with `public_key` in the
    /// [ordering of validators](Self#ordering-of-validators), if it is in the validator set.
    pub fn position(&self, public_key: &PublicKeyBytes) -> Option<usize> {
        self.validators
            .binary_search_by(|v| v.public_key.cmp(public_key))
            .ok()
    }

    /// Compute the total power that a commit must match or exceed (`>=`) in order to count as a quorum
    /// under the validator set.
    pub fn quorum(&self) -> TotalPower {
        const TOTAL_POWER_OVERFLOW: &str =
            "Validator set power exceeds u128::MAX/2. Read the itemdoc for `ValidatorSet`.";

        TotalPower::new(
            (self
                .total_power()
                .int()
                .checked_mul(2)
                .expect(TOTAL_POWER_OVERFLOW)
                / 3)
                + 1,
        )
    }

    /// Compute the validators hash that blocks signed by this validator set carry: the Merkle root over
    /// the canonical encodings of the validators, in order.
    pub fn hash(&self) -> CryptoHash {
        let leaves: Vec<Vec<u8>> = self.validators.iter().map(canonical_bytes).collect();
        hash_from_leaves(&leaves)
    }
}

impl FromIterator<(PublicKeyBytes, Power)> for ValidatorSet {
    fn from_iter<I: IntoIterator<Item = (PublicKeyBytes, Power)>>(iter: I) -> Self {
        let mut validator_set = ValidatorSet::new();
        for (public_key, power) in iter {
            validator_set.put(public_key, power);
        }
        validator_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PublicKeyBytes {
        PublicKeyBytes::new(vec![byte; 48])
    }

    #[test]
    fn validators_are_ordered_by_public_key() {
        let mut validator_set = ValidatorSet::new();
        assert!(validator_set.is_empty());

        validator_set.put(key(3), Power::new(1));
        validator_set.put(key(1), Power::new(2));
        validator_set.put(key(2), Power::new(3));

        assert_eq!(validator_set.len(), 3);
        assert_eq!(validator_set.position(&key(1)), Some(0));
        assert_eq!(validator_set.position(&key(3)), Some(2));
        assert_eq!(validator_set.position(&key(4)), None);
        assert_eq!(validator_set.get(1).map(|v| v.power), Some(Power::new(3)));
    }

    #[test]
    fn put_updates_an_existing_validator() {
        let mut validator_set: ValidatorSet =
            [(key(1), Power::new(1)), (key(2), Power::new(1))].into_iter().collect();
        let hash = validator_set.hash();

        validator_set.put(key(2), Power::new(5));
        assert_eq!(validator_set.len(), 2);
        assert_eq!(validator_set.total_power(), TotalPower::new(6));
        assert_ne!(validator_set.hash(), hash);
    }

    #[test]
    fn quorum_is_more_than_two_thirds() {
        let validator_set: ValidatorSet = (0..4).map(|i| (key(i), Power::new(1))).collect();
        assert_eq!(validator_set.quorum(), TotalPower::new(3));

        let validator_set: ValidatorSet = (0..3).map(|i| (key(i), Power::new(1))).collect();
        assert_eq!(validator_set.quorum(), TotalPower::new(3));
    }
}
