/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fixed-size bitset used to record which validators took part in a commit, and which parts of a part
//! set have been received.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

/// Fixed-size array of bits.
///
/// # Ordering
///
/// When used as the participation set of a [`Commit`](super::commit::Commit), bit `i` refers to the
/// validator at [`position`](super::validator_set::ValidatorSet::position) `i` of the validator set that
/// formed the commit, and the array's [`size`](Self::size) is exactly the number of validators in that
/// set. The size is fixed at construction and never inferred.
///
/// # Canonical form
///
/// Bits are packed little-endian into `u64` words. A canonical `BitArray` has exactly
/// `ceil(size / 64)` words and no bits set beyond `size`; values built through this type's methods are
/// always canonical, and values decoded from bytes are checked with
/// [`is_well_formed`](Self::is_well_formed).
#[derive(Clone, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct BitArray {
    bits: u32,
    words: Vec<u64>,
}

impl BitArray {
    /// Create a new `BitArray` of `bits` bits, all unset.
    pub fn new(bits: u32) -> BitArray {
        BitArray {
            bits,
            words: vec![0; Self::words_for(bits)],
        }
    }

    /// Create a `BitArray` of size 0.
    pub const fn empty() -> BitArray {
        BitArray {
            bits: 0,
            words: Vec::new(),
        }
    }

    /// Get the number of bits in this `BitArray`.
    pub fn size(&self) -> u32 {
        self.bits
    }

    /// Get whether bit `index` is set. Out-of-range indices read as unset.
    pub fn get(&self, index: u32) -> bool {
        if index >= self.bits {
            return false;
        }
        self.words
            .get((index / 64) as usize)
            .map_or(false, |word| *word & (1u64 << (index % 64)) != 0)
    }

    /// Set bit `index` to `value`. Returns `false`, and changes nothing, if `index` is out of range.
    pub fn set(&mut self, index: u32, value: bool) -> bool {
        if index >= self.bits {
            return false;
        }
        let Some(word) = self.words.get_mut((index / 64) as usize) else {
            return false;
        };
        if value {
            *word |= 1 << (index % 64);
        } else {
            *word &= !(1 << (index % 64));
        }
        true
    }

    /// Get the number of set bits.
    pub fn num_bits_set(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// Get whether every bit is set.
    pub fn is_full(&self) -> bool {
        self.num_bits_set() == self.bits
    }

    /// Iterate through the indices of the set bits, in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.bits).filter(move |index| self.get(*index))
    }

    /// Check that the array is in canonical form (see the [type-level docs](Self#canonical-form)).
    pub fn is_well_formed(&self) -> bool {
        if self.words.len() != Self::words_for(self.bits) {
            return false;
        }
        match (self.bits % 64, self.words.last()) {
            (0, _) | (_, None) => true,
            (used, Some(last)) => last >> used == 0,
        }
    }

    fn words_for(bits: u32) -> usize {
        ((bits as usize) + 63) / 64
    }
}

impl Display for BitArray {
    /// Prints `BA{size:bits}`, with `x` for set bits and `_` for unset ones.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BA{{{}:", self.bits)?;
        for index in 0..self.bits {
            f.write_str(if self.get(index) { "x" } else { "_" })?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for BitArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
