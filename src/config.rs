/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Limits that govern how blocks are split into parts and read back from untrusted bytes.
//!
//! Every replica on a network must use the same [`BlockConfiguration::part_size`]: parts made by one
//! replica are only admissible into another replica's [`PartSet`](crate::types::part_set::PartSet) if
//! they are no larger than its part size.

use typed_builder::TypedBuilder;

pub use crate::codec::MAX_BLOCK_SIZE;

/// Size (in bytes) of every part of a block's part set except possibly the last: 64 KiB.
pub const DEFAULT_PART_SIZE: usize = 65_536;

/// Limits used when making, reading, and reassembling blocks.
///
/// Build one with [`BlockConfiguration::builder`], or use [`BlockConfiguration::default`] to take the
/// default of every limit.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [BlockConfiguration]. On the builder call the following methods to
    override the defaults of a [BlockConfiguration].

    Optional:
    - `.max_block_size(...)`
    - `.part_size(...)`
"))]
pub struct BlockConfiguration {
    #[builder(
        default = MAX_BLOCK_SIZE,
        setter(doc = "Set the largest serialized block (in bytes) that will be read. Defaults to [MAX_BLOCK_SIZE].")
    )]
    pub max_block_size: usize,
    #[builder(
        default = DEFAULT_PART_SIZE,
        setter(doc = "Set the size (in bytes) of the parts that blocks are split into. Must be greater than 0. Defaults to [DEFAULT_PART_SIZE].")
    )]
    pub part_size: usize,
}

impl Default for BlockConfiguration {
    fn default() -> Self {
        BlockConfiguration::builder().build()
    }
}
