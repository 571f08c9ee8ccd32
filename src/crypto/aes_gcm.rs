// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-GCM Field Codec for the Free-Text Name
//!
//! Produces envelopes compatible with the Web Crypto API's AES-GCM, which is
//! what the browser client uses for the name field.
//!
//! **Envelope Format** (then base64-encoded for transport):
//! ```text
//! [nonce (12 bytes) | ciphertext | tag (16 bytes)]
//! ```
//!
//! - Nonce: 12 bytes, freshly sampled from the OS RNG on every encryption
//! - Algorithm: AES-256-GCM, key from [`KeyDerivationParams`]
//! - No Additional Authenticated Data

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::crypto::key_derivation::{KeyDerivationParams, SymmetricKey};
use crate::errors::{IdentityError, Result};

/// AES-GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Smallest valid envelope (empty plaintext)
pub const MIN_ENVELOPE_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// Self-contained encrypted blob: nonce followed by ciphertext+tag
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricEnvelope {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl SymmetricEnvelope {
    /// Parse raw envelope bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_ENVELOPE_SIZE {
            return Err(IdentityError::format(
                "envelope",
                format!(
                    "expected at least {} bytes (nonce + tag), got {}",
                    MIN_ENVELOPE_SIZE,
                    bytes.len()
                ),
            ));
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_SIZE..].to_vec(),
        })
    }

    /// Decode the base64 transport form
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| IdentityError::format("envelope", format!("invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Base64 transport form
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext with the 16-byte tag appended
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl fmt::Display for SymmetricEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for SymmetricEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricEnvelope")
            .field("nonce", &hex::encode(self.nonce))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

impl FromStr for SymmetricEnvelope {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Encrypt bytes with AES-256-GCM under a fresh random nonce
pub fn encrypt_aes_gcm(plaintext: &[u8], key: &SymmetricKey) -> Result<SymmetricEnvelope> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| IdentityError::format("key", format!("failed to create cipher: {}", e)))?;

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|e| IdentityError::Encoding(format!("AES-GCM encryption failed: {}", e)))?;

    Ok(SymmetricEnvelope { nonce, ciphertext })
}

/// Decrypt an envelope and verify its tag
///
/// # Errors
///
/// - `Authentication` if the tag does not verify (wrong key or tampering)
/// - `Format` if the authenticated plaintext is not valid UTF-8
pub fn decrypt_aes_gcm(envelope: &SymmetricEnvelope, key: &SymmetricKey) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| IdentityError::format("key", format!("failed to create cipher: {}", e)))?;

    let plaintext_bytes = cipher
        .decrypt(
            Nonce::from_slice(&envelope.nonce),
            Payload {
                msg: &envelope.ciphertext,
                aad: b"",
            },
        )
        .map_err(|_| {
            IdentityError::Authentication(
                "AES-GCM tag verification failed (wrong key or corrupted envelope)".to_string(),
            )
        })?;

    String::from_utf8(plaintext_bytes)
        .map_err(|e| IdentityError::format("plaintext", format!("not valid UTF-8: {}", e)))
}

/// Extract the nonce from raw envelope bytes
pub fn extract_nonce(encrypted: &[u8]) -> Result<&[u8]> {
    if encrypted.len() < NONCE_SIZE {
        return Err(IdentityError::format(
            "envelope",
            format!(
                "cannot extract nonce: expected at least {} bytes, got {}",
                NONCE_SIZE,
                encrypted.len()
            ),
        ));
    }
    Ok(&encrypted[..NONCE_SIZE])
}

/// Encrypts the free-text name field under the owner's address key
#[derive(Debug, Clone, Default)]
pub struct SymmetricFieldCodec {
    params: KeyDerivationParams,
}

impl SymmetricFieldCodec {
    pub fn new(params: KeyDerivationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KeyDerivationParams {
        &self.params
    }

    /// Encrypt `plaintext` for `owner_address`
    pub fn encrypt(&self, plaintext: &str, owner_address: &str) -> Result<SymmetricEnvelope> {
        let key = self.params.derive_key(owner_address)?;
        let envelope = encrypt_aes_gcm(plaintext.as_bytes(), &key)?;
        debug!(
            "Encrypted name field ({} plaintext bytes -> {} envelope bytes)",
            plaintext.len(),
            NONCE_SIZE + envelope.ciphertext.len()
        );
        Ok(envelope)
    }

    /// Decrypt an envelope produced for `owner_address`
    pub fn decrypt(&self, envelope: &SymmetricEnvelope, owner_address: &str) -> Result<String> {
        let key = self.params.derive_key(owner_address)?;
        decrypt_aes_gcm(envelope, &key)
    }

    /// Decrypt the base64 transport form directly
    pub fn decrypt_encoded(&self, encoded: &str, owner_address: &str) -> Result<String> {
        let envelope = SymmetricEnvelope::decode(encoded)?;
        self.decrypt(&envelope, owner_address)
    }
}
