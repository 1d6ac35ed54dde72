/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The block finality core of a BFT blockchain.
//!
//! This crate defines how a block is made, addressed, committed, and moved between replicas:
//! - [Blocks](types::block::BlockEnvelope) wrap an execution-layer [payload](types::payload::Payload)
//!   with the consensus metadata that links them to their parent.
//! - [Commits](types::commit::Commit) prove, with one aggregated signature and a participation
//!   bit array, that a quorum of validators precommitted a block.
//! - [Block IDs](types::block_id::BlockId) address a block by its chain hash and the header of its
//!   [part set](types::part_set::PartSet), so replicas can agree on a block before all of it has
//!   arrived.
//! - Serialized blocks are split into Merkle-provable parts that are checked one at a time as they are
//!   received.
//!
//! Every hashed or transferred structure has a single [canonical encoding](codec), and every hash is
//! the root of a [Merkle tree](merkle) over canonical field encodings.
//!
//! ## Typical usage
//!
//! A proposer calls [`make_block`](types::block::make_block) and gossips the returned parts. Other
//! replicas admit the parts into a [`PartSet`](types::part_set::PartSet) made from the announced
//! header, rebuild the block with
//! [`BlockEnvelope::from_part_set`](types::block::BlockEnvelope::from_part_set), and check it with
//! [`validate_basic`](types::block::BlockEnvelope::validate_basic) and
//! [`validate_linkage`](types::block::BlockEnvelope::validate_linkage).
//!
//! The core holds no threads and does no I/O besides reading from caller-supplied readers. Its
//! [events](events) are logged through the [log](https://docs.rs/log/latest/log/) crate.

pub mod codec;

pub mod config;

pub mod events;

pub mod logging;

pub mod merkle;

pub mod types;
