// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Encryption/Decryption
//!
//! AEAD used to seal revealed values to a session's ephemeral key. The
//! 24-byte nonce is large enough to sample at random for every value.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

use crate::crypto::error::CryptoError;

/// XChaCha20 nonce size in bytes
pub const XNONCE_SIZE: usize = 24;

fn cipher_for(key: &[u8]) -> Result<XChaCha20Poly1305, CryptoError> {
    if key.len() != 32 {
        return Err(CryptoError::InvalidKey {
            key_type: "aead_key".to_string(),
            reason: format!("expected 32 bytes, got {}", key.len()),
        });
    }
    XChaCha20Poly1305::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "aead_key".to_string(),
        reason: e.to_string(),
    })
}

fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != XNONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected_size: XNONCE_SIZE,
            actual_size: nonce.len(),
        });
    }
    Ok(())
}

/// Decrypt data using XChaCha20-Poly1305 AEAD
///
/// # Errors
///
/// Returns error if:
/// - Authentication tag verification fails (tampered data or wrong AAD)
/// - Nonce size is not 24 bytes
/// - Key size is not 32 bytes
pub fn decrypt_with_aead(
    ciphertext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_nonce(nonce)?;
    let cipher = cipher_for(key)?;

    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "xchacha20poly1305_open".to_string(),
            reason: e.to_string(),
        })
}

/// Encrypt data using XChaCha20-Poly1305 AEAD
///
/// Returns the ciphertext with the 16-byte tag appended.
///
/// **CRITICAL**: Never reuse the same nonce with the same key!
pub fn encrypt_with_aead(
    plaintext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_nonce(nonce)?;
    let cipher = cipher_for(key)?;

    cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Other(format!("xchacha20poly1305 seal failed: {}", e)))
}
