/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Canonical binary encoding of every structure that is hashed or sent between replicas.
//!
//! ## Encoding
//!
//! Values are encoded with [Borsh](borsh). Borsh fixes everything a canonical encoding must fix:
//! 1. Fields are written in the order they are declared in the struct.
//! 2. Integers are fixed-width and little-endian.
//! 3. Variable-length sequences (`Vec`, `String`) are prefixed by their length as a `u32`.
//! 4. `Option`s and enums are prefixed by a single tag byte.
//!
//! No type in this crate encodes a hash map, so encodings never depend on iteration order.
//!
//! ## Decoding
//!
//! Decoding is strict. [`decode`] fails with a [`DecodeError`] if the input is larger than the
//! caller's limit, if a length prefix claims more bytes than remain, if a tag byte is invalid, or if
//! bytes remain after a complete value has been read. [`decode_canonical`] additionally requires that
//! re-encoding the decoded value reproduces the input exactly.

use std::io::{self, Read};

use borsh::{BorshDeserialize, BorshSerialize};

/// Largest serialized block (in bytes) a replica is willing to read: 21 MiB.
pub const MAX_BLOCK_SIZE: usize = 22_020_096;

/// Encode `value` into its canonical bytes.
pub fn encode<T: BorshSerialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    value.serialize(&mut buf)?;
    Ok(buf)
}

/// Encode an in-memory `value` whose encoding cannot fail.
///
/// This is used when hashing. Serializing into a `Vec<u8>` only fails when a sequence is longer than
/// `u32::MAX` elements, which no hashed field can be, since every hashed structure either was built
/// locally or was decoded from a buffer bounded by [`MAX_BLOCK_SIZE`].
pub(crate) fn canonical_bytes<T: BorshSerialize + ?Sized>(value: &T) -> Vec<u8> {
    const SERIALIZE_INTO_VEC: &str = "Serializing an in-memory value into a Vec<u8> cannot fail.";
    encode(value).expect(SERIALIZE_INTO_VEC)
}

/// Decode a `T` from `bytes`, which must contain exactly one encoded `T` and be at most `max_size`
/// bytes long.
pub fn decode<T: BorshDeserialize>(bytes: &[u8], max_size: usize) -> Result<T, DecodeError> {
    if bytes.len() > max_size {
        return Err(DecodeError::Oversized {
            len: bytes.len(),
            max: max_size,
        });
    }

    let mut remaining = bytes;
    let value = T::deserialize(&mut remaining).map_err(DecodeError::Malformed)?;
    if !remaining.is_empty() {
        return Err(DecodeError::TrailingBytes(remaining.len()));
    }

    Ok(value)
}

/// Like [`decode`], but also requires that encoding the decoded value reproduces `bytes` exactly.
///
/// Use this on bytes that are about to be hashed or compared with other replicas' bytes, e.g., a
/// block reassembled from a part set.
pub fn decode_canonical<T>(bytes: &[u8], max_size: usize) -> Result<T, DecodeError>
where
    T: BorshDeserialize + BorshSerialize,
{
    let value: T = decode(bytes, max_size)?;
    let reencoded = encode(&value).map_err(|_| DecodeError::NonCanonical)?;
    if reencoded != bytes {
        return Err(DecodeError::NonCanonical);
    }
    Ok(value)
}

/// Read all of `reader` and decode a single `T` from it.
///
/// At most `max_size + 1` bytes are ever read, so a misbehaving reader cannot make this function
/// allocate more than the limit. If the limit is exceeded nothing is decoded.
pub fn decode_from_reader<T, R>(reader: R, max_size: usize) -> Result<T, DecodeError>
where
    T: BorshDeserialize,
    R: Read,
{
    let bytes = read_bounded(reader, max_size)?;
    decode(&bytes, max_size)
}

/// Read all of `reader` into a buffer, failing with [`DecodeError::Oversized`] if it yields more than
/// `max_size` bytes.
pub(crate) fn read_bounded<R: Read>(reader: R, max_size: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::new();
    reader
        .take((max_size as u64).saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(DecodeError::Read)?;

    if buf.len() > max_size {
        return Err(DecodeError::Oversized {
            len: buf.len(),
            max: max_size,
        });
    }

    Ok(buf)
}

/// Error when a value could not be encoded.
#[derive(Debug, thiserror::Error)]
#[error("could not encode value: {0}")]
pub struct EncodeError(#[from] io::Error);

/// The different ways decoding bytes into a value can fail.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input is larger than the limit allowed for the value.
    #[error("input of {len} bytes exceeds the limit of {max} bytes")]
    Oversized { len: usize, max: usize },

    /// The input is truncated, declares a length inconsistent with the remaining input, or contains an
    /// invalid tag.
    #[error("malformed input: {0}")]
    Malformed(io::Error),

    /// Bytes remain after a complete value was read.
    #[error("{0} trailing bytes after a complete value")]
    TrailingBytes(usize),

    /// The decoded value does not re-encode to the bytes it was decoded from.
    #[error("decoded value does not re-encode to its input bytes")]
    NonCanonical,

    /// Reading the input from its source failed.
    #[error("could not read input: {0}")]
    Read(io::Error),
}
