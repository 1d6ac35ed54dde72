/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and traits that make up a finalizable block, and the units it is transferred in.
//!
//! The types build on each other bottom-up: [`data_types`] and [`bit_array`] are plain values,
//! [`block_id`] addresses blocks, [`commit`] proves that a quorum of a [`validator_set`] agreed on a
//! `BlockId`, [`consensus_extra`] carries the commit for a block's parent, and [`block`] wraps a
//! [`payload`] with its extra before it is split into a [`part_set`].

pub mod bit_array;

pub mod block;

pub mod block_id;

pub mod commit;

pub mod consensus_extra;

pub mod crypto_primitives;

pub mod data_types;

pub mod part_set;

pub mod payload;

pub mod validator_set;
