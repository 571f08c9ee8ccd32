// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Sealing to an Ephemeral Session Key
//!
//! The decryption backend never returns plaintext in the clear. It seals
//! each revealed value to the session's ephemeral secp256k1 public key:
//!
//! 1. Backend generates its own one-off keypair
//! 2. ECDH between that key and the session public key
//! 3. HKDF-SHA256 expands the shared x-coordinate into a 32-byte key
//! 4. XChaCha20-Poly1305 seals the value, with the handle bytes as AAD
//!
//! Only the holder of the session private key can open the result.

use hkdf::Hkdf;
use k256::{
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    EncodedPoint, PublicKey, SecretKey,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::encryption::{decrypt_with_aead, encrypt_with_aead, XNONCE_SIZE};
use crate::crypto::error::CryptoError;

/// HKDF info string binding derived keys to this use
const HKDF_INFO: &[u8] = b"encrypted-identity:reveal:v1";

/// A value sealed to a session public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// Sender's one-off public key (33 bytes compressed)
    pub ephemeral_public_key: Vec<u8>,
    pub nonce: Vec<u8>,
    /// Ciphertext with tag appended
    pub ciphertext: Vec<u8>,
}

pub(crate) fn parse_public_key(bytes: &[u8], key_type: &str) -> Result<PublicKey, CryptoError> {
    // Compressed (33 bytes) or uncompressed (65 bytes) SEC1
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(CryptoError::InvalidKey {
            key_type: key_type.to_string(),
            reason: format!("expected 33 or 65 bytes, got {}", bytes.len()),
        });
    }

    let encoded_point = EncodedPoint::from_bytes(bytes).map_err(|e| CryptoError::InvalidKey {
        key_type: key_type.to_string(),
        reason: e.to_string(),
    })?;

    Option::<PublicKey>::from(PublicKey::from_encoded_point(&encoded_point)).ok_or_else(|| {
        CryptoError::InvalidKey {
            key_type: key_type.to_string(),
            reason: "not a valid secp256k1 point".to_string(),
        }
    })
}

/// Derive a shared encryption key using ECDH
///
/// # Arguments
///
/// * `peer_public_key` - Peer's public key (33 bytes compressed or 65 bytes uncompressed)
/// * `own_private_key` - Own private key (32 bytes)
///
/// # Returns
///
/// A 32-byte key suitable for XChaCha20-Poly1305. Both sides of the
/// exchange derive the same key.
pub fn derive_shared_key(
    peer_public_key: &[u8],
    own_private_key: &[u8],
) -> Result<[u8; 32], CryptoError> {
    if own_private_key.len() != 32 {
        return Err(CryptoError::InvalidKey {
            key_type: "private_key".to_string(),
            reason: format!("expected 32 bytes, got {}", own_private_key.len()),
        });
    }

    let own_secret =
        SecretKey::from_slice(own_private_key).map_err(|e| CryptoError::InvalidKey {
            key_type: "private_key".to_string(),
            reason: e.to_string(),
        })?;

    let peer = parse_public_key(peer_public_key, "peer_public_key")?;

    let shared_secret =
        k256::ecdh::diffie_hellman(own_secret.to_nonzero_scalar(), peer.as_affine());

    let hkdf = Hkdf::<Sha256>::new(None, shared_secret.raw_secret_bytes());
    let mut derived_key = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut derived_key)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;

    Ok(derived_key)
}

/// Seal `plaintext` so that only the holder of `recipient_public_key` can open it
pub fn seal_to_public_key(
    recipient_public_key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedValue, CryptoError> {
    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_public_key = ephemeral
        .public_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec();

    let key = derive_shared_key(recipient_public_key, ephemeral.to_bytes().as_slice())?;

    let mut nonce = [0u8; XNONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = encrypt_with_aead(plaintext, &nonce, aad, &key)?;

    Ok(SealedValue {
        ephemeral_public_key,
        nonce: nonce.to_vec(),
        ciphertext,
    })
}

/// Open a value sealed to the public key matching `recipient_private_key`
pub fn open_sealed(
    sealed: &SealedValue,
    recipient_private_key: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let key = derive_shared_key(&sealed.ephemeral_public_key, recipient_private_key)?;
    decrypt_with_aead(&sealed.ciphertext, &sealed.nonce, aad, &key)
}
