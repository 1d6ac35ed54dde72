use std::{
    io::Read,
    sync::{Arc, Mutex},
    thread,
};

use bft_finality::{
    config::{BlockConfiguration, DEFAULT_PART_SIZE, MAX_BLOCK_SIZE},
    merkle::{leaf_hash, MerkleProofError},
    types::{
        block_id::PartSetHeader,
        data_types::CryptoHash,
        part_set::{Part, PartSet, PartSetError},
    },
};
use log::LevelFilter;
use proptest::prelude::*;
use rand::{seq::SliceRandom, thread_rng, RngCore};

mod common;

use crate::common::logging::setup_logger;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0; len];
    thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn read_all(part_set: &PartSet) -> Vec<u8> {
    let mut bytes = Vec::new();
    part_set
        .get_reader()
        .unwrap()
        .read_to_end(&mut bytes)
        .unwrap();
    bytes
}

// An empty part set that admits the parts of `sent`, each at most `part_size` bytes long.
fn receiver(sent: &PartSet, part_size: usize) -> PartSet {
    let config = BlockConfiguration::builder().part_size(part_size).build();
    PartSet::new_from_header(sent.header().clone(), &config).unwrap()
}

fn sent_parts(part_set: &PartSet) -> Vec<Part> {
    part_set.parts().cloned().collect()
}

proptest! {
    #[test]
    fn split_then_reassemble_reproduces_data(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        part_size in 1usize..300,
    ) {
        let sent = PartSet::new_from_data(&data, part_size);
        prop_assert_eq!(sent.total() as usize, (data.len() + part_size - 1) / part_size);
        prop_assert!(sent.is_complete());
        prop_assert_eq!(sent.byte_size(), data.len());
        prop_assert_eq!(read_all(&sent), data.clone());

        let mut received = receiver(&sent, part_size);
        for part in sent_parts(&sent).into_iter().rev() {
            prop_assert_eq!(received.add_part(part), Ok(()));
        }
        prop_assert!(received.is_complete());
        prop_assert_eq!(read_all(&received), data);
    }
}

#[test]
fn parts_are_admitted_in_any_order() {
    setup_logger(LevelFilter::Trace);

    let data = random_bytes(100_000);
    let sent = PartSet::new_from_data(&data, 1024);
    assert_eq!(sent.total(), 98);

    let mut parts = sent_parts(&sent);
    parts.shuffle(&mut thread_rng());

    let mut received = receiver(&sent, 1024);
    assert!(received.has_header(sent.header()));
    for (admitted, part) in parts.into_iter().enumerate() {
        assert!(!received.is_complete());
        let index = part.index;
        assert_eq!(received.add_part(part), Ok(()));
        assert!(received.parts_bit_array().get(index));
        assert_eq!(received.count() as usize, admitted + 1);
    }

    assert!(received.is_complete());
    assert!(received.parts_bit_array().is_full());
    assert_eq!(received.byte_size(), data.len());
    assert_eq!(read_all(&received), data);
}

#[test]
fn last_part_holds_the_remainder() {
    let sent = PartSet::new_from_data(b"0123456789", 4);
    let sizes: Vec<usize> = sent.parts().map(|part| part.bytes.len()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    for part in sent.parts() {
        assert_eq!(part.hash(), part.proof.leaf_hash);
        assert_eq!(part.proof.total, 3);
    }
}

#[test]
fn empty_data_makes_no_parts() {
    let sent = PartSet::new_from_data(&[], 16);
    assert_eq!(sent.total(), 0);
    assert!(sent.header().is_zero());
    assert!(sent.is_complete());
    assert!(read_all(&sent).is_empty());
}

#[test]
#[should_panic]
fn zero_part_size_panics() {
    PartSet::new_from_data(b"abc", 0);
}

#[test]
fn forged_parts_are_rejected_without_changing_state() {
    setup_logger(LevelFilter::Trace);

    let sent = PartSet::new_from_data(&random_bytes(320), 64);
    let parts = sent_parts(&sent);
    let mut received = receiver(&sent, 64);

    // Bytes that do not match the proof's leaf hash.
    let mut tampered = parts[2].clone();
    tampered.bytes[0] ^= 1;
    assert_eq!(
        received.add_part(tampered.clone()),
        Err(PartSetError::InvalidProof {
            index: 2,
            source: MerkleProofError::LeafHashMismatch
        })
    );

    // A consistent leaf hash that is not in the tree.
    tampered.proof.leaf_hash = leaf_hash(&tampered.bytes);
    assert_eq!(
        received.add_part(tampered),
        Err(PartSetError::InvalidProof {
            index: 2,
            source: MerkleProofError::RootMismatch
        })
    );

    // A genuine part presented at another index.
    let mut moved = parts[1].clone();
    moved.index = 3;
    assert!(matches!(
        received.add_part(moved),
        Err(PartSetError::InvalidProof {
            index: 3,
            source: MerkleProofError::PositionMismatch { .. }
        })
    ));

    assert_eq!(received.count(), 0);
    assert_eq!(received.byte_size(), 0);
    assert_eq!(received.parts_bit_array().num_bits_set(), 0);
    assert!(received.get_part(2).is_none());

    assert_eq!(received.add_part(parts[2].clone()), Ok(()));
    assert_eq!(received.get_part(2), Some(&parts[2]));
}

#[test]
fn out_of_range_parts_are_rejected() {
    let sent = PartSet::new_from_data(&random_bytes(320), 64);
    let mut received = receiver(&sent, 64);

    let mut part = sent_parts(&sent)[4].clone();
    part.index = 5;
    assert_eq!(
        received.add_part(part),
        Err(PartSetError::IndexOutOfRange { index: 5, total: 5 })
    );
    assert_eq!(received.count(), 0);
}

#[test]
fn oversized_parts_are_rejected() {
    let sent = PartSet::new_from_data(&random_bytes(128), 64);
    let mut received = receiver(&sent, 32);
    assert_eq!(
        received.add_part(sent_parts(&sent)[0].clone()),
        Err(PartSetError::PartTooLarge { len: 64, max: 32 })
    );
}

#[test]
fn duplicate_parts_are_rejected() {
    let sent = PartSet::new_from_data(&random_bytes(128), 64);
    let part = sent_parts(&sent)[0].clone();
    let mut received = receiver(&sent, 64);

    assert_eq!(received.add_part(part.clone()), Ok(()));
    assert_eq!(received.add_part(part), Err(PartSetError::DuplicatePart(0)));
    assert_eq!(received.count(), 1);
    assert_eq!(received.byte_size(), 64);
}

#[test]
fn incomplete_part_set_has_no_reader() {
    let sent = PartSet::new_from_data(&random_bytes(150), 64);
    let mut received = receiver(&sent, 64);
    received.add_part(sent_parts(&sent)[1].clone()).unwrap();

    assert!(matches!(
        received.get_reader(),
        Err(PartSetError::IncompleteData { count: 1, total: 3 })
    ));
}

#[test]
fn header_without_hash_is_rejected() {
    let header = PartSetHeader {
        total: 1,
        hash: None,
    };
    assert_eq!(
        PartSet::new_from_header(header, &BlockConfiguration::default()).unwrap_err(),
        PartSetError::MissingHash { total: 1 }
    );

    let empty = PartSet::new_from_header(PartSetHeader::zero(), &BlockConfiguration::default())
        .unwrap();
    assert!(empty.is_complete());
}

#[test]
fn header_with_more_parts_than_the_largest_block_is_rejected() {
    let hash = CryptoHash::new([7; 32]);
    let max = ((MAX_BLOCK_SIZE + DEFAULT_PART_SIZE - 1) / DEFAULT_PART_SIZE) as u32;

    assert_eq!(
        PartSet::new_from_header(
            PartSetHeader::new(u32::MAX, hash),
            &BlockConfiguration::default()
        )
        .unwrap_err(),
        PartSetError::TooManyParts {
            total: u32::MAX,
            max: max as u64
        }
    );
    assert!(matches!(
        PartSet::new_from_header(
            PartSetHeader::new(max + 1, hash),
            &BlockConfiguration::default()
        ),
        Err(PartSetError::TooManyParts { .. })
    ));

    let largest =
        PartSet::new_from_header(PartSetHeader::new(max, hash), &BlockConfiguration::default())
            .unwrap();
    assert_eq!(largest.total(), max);
    assert_eq!(largest.count(), 0);

    // The limit follows the configured sizes.
    let small = BlockConfiguration::builder()
        .max_block_size(1000)
        .part_size(100)
        .build();
    assert!(PartSet::new_from_header(PartSetHeader::new(10, hash), &small).is_ok());
    assert_eq!(
        PartSet::new_from_header(PartSetHeader::new(11, hash), &small).unwrap_err(),
        PartSetError::TooManyParts { total: 11, max: 10 }
    );
}

#[test]
fn parts_from_many_peers_are_admitted_under_a_lock() {
    let data = random_bytes(64 * 40 + 17);
    let sent = PartSet::new_from_data(&data, 64);
    let received = Arc::new(Mutex::new(receiver(&sent, 64)));

    // Every peer sends every part, so most admissions are duplicates.
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let received = Arc::clone(&received);
            let mut parts = sent_parts(&sent);
            parts.shuffle(&mut thread_rng());
            thread::spawn(move || {
                let mut admitted = 0;
                for part in parts {
                    match received.lock().unwrap().add_part(part) {
                        Ok(()) => admitted += 1,
                        Err(PartSetError::DuplicatePart(_)) => {}
                        Err(err) => panic!("unexpected rejection: {err}"),
                    }
                }
                admitted
            })
        })
        .collect();
    let admitted: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let received = received.lock().unwrap();
    assert_eq!(admitted, received.total());
    assert!(received.is_complete());
    assert_eq!(read_all(&received), data);
}
