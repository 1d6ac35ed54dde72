use bft_finality::{
    codec::{decode, encode, MAX_BLOCK_SIZE},
    types::{
        block_id::{BlockId, PartSetHeader, NULL_BLOCK_ID_SIGN_BYTES},
        data_types::CryptoHash,
    },
};

fn hash(byte: u8) -> CryptoHash {
    CryptoHash::new([byte; 32])
}

#[test]
fn zero_block_id_signs_the_sentinel() {
    assert!(BlockId::zero().is_zero());
    assert!(BlockId::default().is_zero());
    assert!(PartSetHeader::zero().is_zero());

    assert_eq!(BlockId::zero().sign_bytes(), NULL_BLOCK_ID_SIGN_BYTES);
    let mut written = Vec::new();
    BlockId::zero().write_sign_bytes(&mut written).unwrap();
    assert_eq!(written, b"null");
}

#[test]
fn non_zero_block_ids_never_sign_the_sentinel() {
    let block_ids = [
        BlockId {
            hash: Some(hash(1)),
            parts_header: PartSetHeader::zero(),
        },
        BlockId {
            hash: None,
            parts_header: PartSetHeader {
                total: 1,
                hash: None,
            },
        },
        BlockId::new(hash(1), PartSetHeader::new(4, hash(2))),
    ];

    for block_id in block_ids {
        assert!(!block_id.is_zero());
        let sign_bytes = block_id.sign_bytes();
        assert_ne!(sign_bytes, NULL_BLOCK_ID_SIGN_BYTES);
        assert!(sign_bytes.len() >= 6);
        assert_eq!(sign_bytes, encode(&block_id).unwrap());

        let mut written = Vec::new();
        block_id.write_sign_bytes(&mut written).unwrap();
        assert_eq!(written, sign_bytes);
    }
}

#[test]
fn keys_distinguish_hash_from_parts_header() {
    let a = BlockId::new(hash(1), PartSetHeader::new(1, hash(2)));
    let b = BlockId::new(hash(2), PartSetHeader::new(1, hash(1)));
    let c = BlockId {
        hash: None,
        parts_header: PartSetHeader::new(1, hash(1)),
    };

    assert_ne!(a.key(), b.key());
    assert_ne!(a.key(), c.key());
    assert_ne!(b.key(), c.key());
    assert_eq!(a.key(), a.clone().key());
}

#[test]
fn block_id_survives_the_codec() {
    let block_id = BlockId::new(hash(3), PartSetHeader::new(7, hash(4)));
    let decoded: BlockId = decode(&encode(&block_id).unwrap(), MAX_BLOCK_SIZE).unwrap();
    assert!(decoded.equals(&block_id));
    assert!(decoded.parts_header.equals(&block_id.parts_header));
}

#[test]
fn display_prints_hex_and_total() {
    let block_id = BlockId::new(hash(0xAB), PartSetHeader::new(2, hash(0x01)));
    assert_eq!(
        block_id.to_string(),
        format!("{}:2:{}", "AB".repeat(32), "01".repeat(32))
    );
    assert_eq!(PartSetHeader::zero().to_string(), "0:");
}
