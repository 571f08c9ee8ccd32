// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for the name field envelope
// Format matches Web Crypto AES-GCM: base64(nonce (12 bytes) | ciphertext | tag)

use encrypted_identity::crypto::aes_gcm::{SymmetricEnvelope, MIN_ENVELOPE_SIZE, NONCE_SIZE};
use encrypted_identity::crypto::key_derivation::KeyDerivationParams;
use encrypted_identity::{IdentityError, SymmetricFieldCodec};

const OWNER: &str = "0x9FB3DC39F2C0B4aE35fc916c18f5b729C113ea36";
const OTHER: &str = "0x1111111111111111111111111111111111111111";

fn codec() -> SymmetricFieldCodec {
    SymmetricFieldCodec::new(KeyDerivationParams::new("encrypted-identity:v1", 1_000).unwrap())
}

/// Envelope produced by a browser client with iv = 01..0c
#[test]
fn test_decrypts_browser_envelope() {
    let codec = SymmetricFieldCodec::default();
    let name = codec
        .decrypt_encoded("AQIDBAUGBwgJCgsMJL+G08XM5SptMvD5YHI0Wc4GXqSx", OWNER)
        .unwrap();
    assert_eq!(name, "Alice");
}

#[test]
fn test_roundtrip_various_names() {
    let codec = codec();
    let long = "x".repeat(4096);
    for name in ["Alice", "", "Ünïcødé 名前", long.as_str()] {
        let envelope = codec.encrypt(name, OWNER).unwrap();
        assert_eq!(codec.decrypt(&envelope, OWNER).unwrap(), name);

        let transported = envelope.encode();
        assert_eq!(codec.decrypt_encoded(&transported, OWNER).unwrap(), name);
    }
}

#[test]
fn test_nonce_freshness() {
    let codec = codec();
    let a = codec.encrypt("Alice", OWNER).unwrap();
    let b = codec.encrypt("Alice", OWNER).unwrap();

    assert_ne!(a.nonce(), b.nonce());
    assert_ne!(a.encode(), b.encode());
    assert_eq!(codec.decrypt(&a, OWNER).unwrap(), "Alice");
    assert_eq!(codec.decrypt(&b, OWNER).unwrap(), "Alice");
}

#[test]
fn test_every_bit_flip_detected() {
    let codec = codec();
    let bytes = codec.encrypt("Alice", OWNER).unwrap().to_bytes();

    for i in 0..bytes.len() {
        for bit in 0..8 {
            let mut tampered = bytes.clone();
            tampered[i] ^= 1 << bit;
            let envelope = SymmetricEnvelope::from_bytes(&tampered).unwrap();
            assert!(
                matches!(
                    codec.decrypt(&envelope, OWNER),
                    Err(IdentityError::Authentication(_))
                ),
                "flip at byte {} bit {} not detected",
                i,
                bit
            );
        }
    }
}

#[test]
fn test_cross_key_isolation() {
    let codec = codec();
    let envelope = codec.encrypt("Alice", OWNER).unwrap();
    assert!(matches!(
        codec.decrypt(&envelope, OTHER),
        Err(IdentityError::Authentication(_))
    ));
}

#[test]
fn test_short_and_malformed_envelopes() {
    let codec = codec();

    let short = vec![0u8; MIN_ENVELOPE_SIZE - 1];
    assert!(matches!(
        SymmetricEnvelope::from_bytes(&short),
        Err(IdentityError::Format { .. })
    ));
    assert!(matches!(
        codec.decrypt_encoded("AAAA", OWNER),
        Err(IdentityError::Format { .. })
    ));
    assert!(matches!(
        codec.decrypt_encoded("not base64 at all!", OWNER),
        Err(IdentityError::Format { .. })
    ));

    // Exactly nonce + tag: empty plaintext slot, tag cannot verify
    let minimal = SymmetricEnvelope::from_bytes(&[7u8; MIN_ENVELOPE_SIZE]).unwrap();
    assert_eq!(minimal.nonce().len(), NONCE_SIZE);
    assert!(matches!(
        codec.decrypt(&minimal, OWNER),
        Err(IdentityError::Authentication(_))
    ));
}
