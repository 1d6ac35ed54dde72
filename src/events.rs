/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted while making, transferring, and reassembling blocks.
//!
//! An event for a given action indicates that the action has been completed (or, for `Reject*` events,
//! that the input was rejected). Every event is printed through the [`logging`](crate::logging) module.

use std::time::SystemTime;

use crate::types::{
    block_id::PartSetHeader,
    data_types::{BlockHeight, CryptoHash},
};

/// A block envelope was made and split into a part set.
pub struct MakeBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub block: Option<CryptoHash>,
    pub parts: PartSetHeader,
}

/// A block envelope was encoded into its transfer bytes.
pub struct EncodeBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub size: usize,
}

/// A block envelope was decoded from transfer bytes.
pub struct DecodeBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub block: Option<CryptoHash>,
    pub size: usize,
}

/// Transfer bytes or a block envelope were rejected, either while decoding or in basic validation.
pub struct RejectBlockEvent {
    pub timestamp: SystemTime,
    pub height: Option<BlockHeight>,
    pub reason: String,
}

/// A part was admitted into a part set.
pub struct AddPartEvent {
    pub timestamp: SystemTime,
    pub index: u32,
    pub count: u32,
    pub total: u32,
}

/// A part was rejected at admission into a part set. The part set is unchanged.
pub struct RejectPartEvent {
    pub timestamp: SystemTime,
    pub index: u32,
    pub reason: String,
}

/// The last missing part of a part set was admitted.
pub struct CompletePartSetEvent {
    pub timestamp: SystemTime,
    pub parts: PartSetHeader,
    pub byte_size: usize,
}
