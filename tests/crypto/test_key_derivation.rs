// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for address-based key derivation

use encrypted_identity::crypto::key_derivation::{
    derive_key, normalize_address, KeyDerivationParams,
};
use encrypted_identity::IdentityError;

const OWNER: &str = "0x9FB3DC39F2C0B4aE35fc916c18f5b729C113ea36";

/// Known answer with the protocol defaults
#[test]
fn test_default_params_known_answer() {
    let key = derive_key(OWNER).unwrap();
    assert_eq!(
        hex::encode(key.as_bytes()),
        "a33d9c23f9b3b7f77f9a2d594dbcaab0282154a0ef2f4e6e6a8d29abc234b679"
    );
}

#[test]
fn test_case_variants_share_key() {
    let params = KeyDerivationParams::new("encrypted-identity:v1", 1_000).unwrap();
    let mixed = params.derive_key(OWNER).unwrap();
    let lower = params.derive_key(&OWNER.to_lowercase()).unwrap();
    let upper_body = format!("0x{}", OWNER[2..].to_uppercase());
    let upper = params.derive_key(&upper_body).unwrap();

    assert_eq!(mixed.as_bytes(), lower.as_bytes());
    assert_eq!(mixed.as_bytes(), upper.as_bytes());
    assert_eq!(
        params.derive_key(OWNER).unwrap().as_bytes(),
        mixed.as_bytes()
    );
}

#[test]
fn test_salt_separates_key_spaces() {
    let a = KeyDerivationParams::new("encrypted-identity:v1", 1_000).unwrap();
    let b = KeyDerivationParams::new("another-protocol", 1_000).unwrap();
    assert_ne!(
        a.derive_key(OWNER).unwrap().as_bytes(),
        b.derive_key(OWNER).unwrap().as_bytes()
    );
}

#[test]
fn test_malformed_address_rejected() {
    for input in ["", "0x", "0x1234", "9FB3DC39F2C0B4aE35fc916c18f5b729C113ea3Z", "alice"] {
        assert!(
            matches!(
                normalize_address(input),
                Err(IdentityError::InvalidAddress { .. })
            ),
            "accepted {:?}",
            input
        );
    }
    assert_eq!(
        normalize_address(OWNER).unwrap(),
        "0x9fb3dc39f2c0b4ae35fc916c18f5b729c113ea36"
    );
}
