// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Address Key Derivation
//!
//! Derives the per-identity AES-256 key from an account address using
//! PBKDF2-HMAC-SHA256 with a fixed protocol salt. Matches the Web Crypto
//! `deriveKey({ name: "PBKDF2", hash: "SHA-256" })` call used by the browser
//! client, so envelopes produced there decrypt here and vice versa.
//!
//! The address is public, so the key is not a secret from anyone who knows
//! the address. It only gives each user a stable keyspace without storing a
//! key anywhere; read access to the ciphertext is gated by the registry.

use ethers::types::Address;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use tracing::debug;

use crate::errors::{IdentityError, Result};

/// Protocol-wide salt separating this keyspace from other PBKDF2 users
pub const KEY_SALT: &str = "encrypted-identity:v1";

/// PBKDF2 iteration count
pub const KDF_ITERATIONS: u32 = 100_000;

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;

/// A derived 256-bit symmetric key
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// PBKDF2 parameters for address key derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDerivationParams {
    salt: String,
    iterations: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            salt: KEY_SALT.to_string(),
            iterations: KDF_ITERATIONS,
        }
    }
}

impl KeyDerivationParams {
    pub fn new(salt: impl Into<String>, iterations: u32) -> Result<Self> {
        let salt = salt.into();
        if salt.is_empty() {
            return Err(IdentityError::Config("key salt must not be empty".to_string()));
        }
        if iterations == 0 {
            return Err(IdentityError::Config(
                "kdf iterations must be greater than zero".to_string(),
            ));
        }
        Ok(Self { salt, iterations })
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derive the symmetric key for an address string.
    ///
    /// Mixed-case (checksummed) and lower-case forms of the same address
    /// yield the same key. Malformed input is rejected before derivation.
    pub fn derive_key(&self, address: &str) -> Result<SymmetricKey> {
        let normalized = normalize_address(address)?;
        Ok(self.derive_normalized(&normalized))
    }

    /// Derive the symmetric key for a parsed address
    pub fn derive_key_for(&self, address: &Address) -> SymmetricKey {
        self.derive_normalized(&address_to_string(address))
    }

    fn derive_normalized(&self, normalized: &str) -> SymmetricKey {
        debug!(
            "Deriving field key (iterations: {}, salt: {})",
            self.iterations, self.salt
        );
        let mut key = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(
            normalized.as_bytes(),
            self.salt.as_bytes(),
            self.iterations,
            &mut key,
        );
        SymmetricKey(key)
    }
}

/// Derive the field key with the protocol's default parameters
pub fn derive_key(address: &str) -> Result<SymmetricKey> {
    KeyDerivationParams::default().derive_key(address)
}

/// Validate an address string and fold it to `0x` + 40 lower-case hex chars
pub fn normalize_address(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if body.len() != 40 {
        return Err(IdentityError::InvalidAddress {
            input: input.to_string(),
            reason: format!("expected 40 hex characters, got {}", body.len()),
        });
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IdentityError::InvalidAddress {
            input: input.to_string(),
            reason: "contains non-hex characters".to_string(),
        });
    }

    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

/// Parse an address string into an [`Address`]
pub fn parse_address(input: &str) -> Result<Address> {
    let normalized = normalize_address(input)?;
    let bytes = hex::decode(&normalized[2..]).map_err(|e| IdentityError::InvalidAddress {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Address::from_slice(&bytes))
}

/// Lower-case `0x`-prefixed rendering of an address
pub fn address_to_string(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}
