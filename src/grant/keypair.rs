// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ephemeral session keypair
//!
//! Generated per authorization session. The public half goes into the signed
//! grant; revealed values come back sealed to it. The private half never
//! leaves this struct and is dropped with the session.

use ethers::types::U256;
use k256::{elliptic_curve::sec1::ToEncodedPoint, SecretKey};
use rand::rngs::OsRng;
use std::fmt;

use crate::crypto::ecdh::open_sealed;
use crate::errors::{IdentityError, Result};
use crate::fhe::backend::SealedReveal;

pub struct AuthorizationKeypair {
    secret: SecretKey,
    public_key: Vec<u8>,
}

impl AuthorizationKeypair {
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public_key = secret.public_key().to_encoded_point(true).as_bytes().to_vec();
        Self { secret, public_key }
    }

    /// Compressed SEC1 public key
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// `0x`-prefixed hex of the public key, as carried in the grant
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.public_key))
    }

    /// Open a sealed reveal into its 32-byte big-endian value
    pub fn open(&self, reveal: &SealedReveal) -> Result<U256> {
        let plaintext = open_sealed(
            &reveal.sealed,
            self.secret.to_bytes().as_slice(),
            reveal.handle.as_bytes(),
        )?;
        if plaintext.len() != 32 {
            return Err(IdentityError::format(
                "revealed value",
                format!("expected 32 bytes, got {}", plaintext.len()),
            ));
        }
        Ok(U256::from_big_endian(&plaintext))
    }
}

impl fmt::Debug for AuthorizationKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationKeypair")
            .field("public_key", &self.public_key_hex())
            .field("secret", &"<redacted>")
            .finish()
    }
}
