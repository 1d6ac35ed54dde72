/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out [events](crate::events).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the event in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [`MakeBlockEvent`] is printed:
//!
//! ```text
//! MakeBlock, 1701329264, fNGCJyk, 12, 3
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the block's chain hash.
//! - The fourth value is the height of the block.
//! - The fifth value is the number of parts the block was split into.
//!
//! Rejections (`RejectBlock`, `RejectPart`) are logged at the `warn` level, part admissions at `debug`,
//! and everything else at `info`.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const MAKE_BLOCK: &str = "MakeBlock";
pub const ENCODE_BLOCK: &str = "EncodeBlock";
pub const DECODE_BLOCK: &str = "DecodeBlock";
pub const REJECT_BLOCK: &str = "RejectBlock";
pub const ADD_PART: &str = "AddPart";
pub const REJECT_PART: &str = "RejectPart";
pub const COMPLETE_PART_SET: &str = "CompletePartSet";

/// Implemented by event types. Used to get a closure that logs the event.
pub trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

/// Log `event` with its default logging handler.
pub(crate) fn log_event<E: Logger>(event: &E) {
    (E::get_logger())(event)
}

impl Logger for MakeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |make_block_event: &MakeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                MAKE_BLOCK,
                secs_since_unix_epoch(make_block_event.timestamp),
                optional_hash_chars(make_block_event.block.as_ref()),
                make_block_event.height,
                make_block_event.parts.total
            )
        };
        Box::new(logger)
    }
}

impl Logger for EncodeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |encode_block_event: &EncodeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                ENCODE_BLOCK,
                secs_since_unix_epoch(encode_block_event.timestamp),
                encode_block_event.height,
                encode_block_event.size
            )
        };
        Box::new(logger)
    }
}

impl Logger for DecodeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |decode_block_event: &DecodeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                DECODE_BLOCK,
                secs_since_unix_epoch(decode_block_event.timestamp),
                optional_hash_chars(decode_block_event.block.as_ref()),
                decode_block_event.height,
                decode_block_event.size
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_block_event: &RejectBlockEvent| {
            log::warn!(
                "{}, {}, {}, {}",
                REJECT_BLOCK,
                secs_since_unix_epoch(reject_block_event.timestamp),
                reject_block_event
                    .height
                    .map(|height| height.to_string())
                    .unwrap_or_default(),
                reject_block_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for AddPartEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |add_part_event: &AddPartEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}",
                ADD_PART,
                secs_since_unix_epoch(add_part_event.timestamp),
                add_part_event.index,
                add_part_event.count,
                add_part_event.total
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectPartEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_part_event: &RejectPartEvent| {
            log::warn!(
                "{}, {}, {}, {}",
                REJECT_PART,
                secs_since_unix_epoch(reject_part_event.timestamp),
                reject_part_event.index,
                reject_part_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for CompletePartSetEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |complete_part_set_event: &CompletePartSetEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                COMPLETE_PART_SET,
                secs_since_unix_epoch(complete_part_set_event.timestamp),
                optional_hash_chars(complete_part_set_event.parts.hash.as_ref()),
                complete_part_set_event.parts.total,
                complete_part_set_event.byte_size
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn optional_hash_chars<H: AsRef<[u8]>>(hash: Option<&H>) -> String {
    hash.map(|hash| first_seven_base64_chars(hash.as_ref()))
        .unwrap_or_else(|| "nil".to_string())
}

pub(crate) fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviates_to_seven_base64_chars() {
        assert_eq!(first_seven_base64_chars(&[0u8; 32]), "AAAAAAA");
        assert_eq!(first_seven_base64_chars(&[0xff]), "/w");
    }
}
