/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::{Add, AddAssign, Sub},
    time::{SystemTime, UNIX_EPOCH},
};

use borsh::{BorshDeserialize, BorshSerialize};

/// String that uniquely identifies a blockchain.
///
/// Every block of a chain carries the same `ChainID` for the whole lifetime of the chain. Blocks
/// whose `ChainID` differs from the one a replica expects are rejected in
/// [`validate_basic`](crate::types::block::BlockEnvelope::validate_basic).
#[derive(Clone, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct ChainID(String);

impl ChainID {
    /// Create a new `ChainID` from anything that converts into a `String`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string of this `ChainID`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChainID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for ChainID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Height of a block in the chain.
///
/// Height 1 is the first block after genesis. A block at height `h` carries the commit for the block at
/// height `h - 1` as its seen commit.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the height that directly follows this one, or `None` on overflow.
    pub fn checked_next(&self) -> Option<BlockHeight> {
        self.0.checked_add(1).map(BlockHeight)
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AddAssign<u64> for BlockHeight {
    fn add_assign(&mut self, rhs: u64) {
        self.0.add_assign(rhs)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;
    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight::new(self.0.add(rhs))
    }
}

impl Sub<BlockHeight> for BlockHeight {
    type Output = u64;
    fn sub(self, rhs: BlockHeight) -> Self::Output {
        self.0 - rhs.0
    }
}

/// Voting round within a height in which a commit was formed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct Round(u32);

impl Round {
    /// Create a new `Round` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` of this `Round`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Number of the validator-set validity period (epoch) a block belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct EpochNumber(u64);

impl EpochNumber {
    /// Create a new `EpochNumber` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` of this `EpochNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for EpochNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// 32-byte cryptographic hash.
///
/// Every `CryptoHash` produced by this crate is a SHA-256 digest, computed either directly by
/// [`merkle::leaf_hash`](crate::merkle::leaf_hash) or as the root of a Merkle tree.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Number of bytes in a `CryptoHash`.
    pub const LENGTH: usize = 32;

    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Get a reference to the inner bytes of this `CryptoHash`.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for CryptoHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for CryptoHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::UpperHex for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(self, f)
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(self, f)
    }
}

/// Wall-clock time at which a block was made, in milliseconds since the Unix Epoch.
///
/// Stored as an integer so that its canonical encoding does not depend on the platform's clock
/// representation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new `Timestamp` from a number of milliseconds since the Unix Epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the current wall-clock time.
    ///
    /// Clocks set before the Unix Epoch read as the Epoch itself.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Get the number of milliseconds since the Unix Epoch.
    pub const fn millis(&self) -> u64 {
        self.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Aggregated signature over a commit's [sign bytes](crate::types::commit::Commit::sign_bytes).
///
/// The bytes are opaque to this crate. They are produced and checked by the signature aggregation
/// scheme of the validator set (e.g., BLS), which a caller plugs in through
/// [`AggregateSignatureVerifier`](crate::types::commit::AggregateSignatureVerifier).
#[derive(Clone, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct SignatureAggregate(Vec<u8>);

impl SignatureAggregate {
    /// Create a new `SignatureAggregate` wrapping `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get a reference to the inner bytes of this `SignatureAggregate`.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check whether the aggregate contains no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for SignatureAggregate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureAggregate({} bytes)", self.0.len())
    }
}

/// Public key of a validator, in whatever encoding the signature aggregation scheme uses.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct PublicKeyBytes(Vec<u8>);

impl PublicKeyBytes {
    /// Create a new `PublicKeyBytes` wrapping `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get a reference to the inner bytes of this `PublicKeyBytes`.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().take(6) {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Weight of a specific validator's votes in consensus decisions.
///
/// The higher the power, the more weight the validator's votes have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Power(u64);

impl Power {
    /// Create a new `Power` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `Power`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

/// Sum of the [`Power`]s of a group of validators.
///
/// The inner type is `u128` so that summing up large `Power`s cannot overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct TotalPower(u128);

impl TotalPower {
    /// Create a new `TotalPower` wrapping `int`.
    pub const fn new(int: u128) -> Self {
        Self(int)
    }

    /// Get the inner `u128` value of this `TotalPower`.
    pub const fn int(&self) -> u128 {
        self.0
    }
}

impl AddAssign<Power> for TotalPower {
    fn add_assign(&mut self, rhs: Power) {
        self.0.add_assign(rhs.0 as u128)
    }
}
