// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cryptographic Primitives
//!
//! - **Key Derivation**: PBKDF2-HMAC-SHA256 from the owner's address
//! - **AES-GCM**: Web Crypto compatible envelopes for the name field
//! - **ECDH**: sealing revealed values to a session's ephemeral key
//! - **Encryption**: XChaCha20-Poly1305 AEAD used by the sealing
//! - **Signature**: ECDSA recovery of typed-data signers
//!
//! ## Security Considerations
//!
//! - Every envelope uses a fresh random nonce
//! - Derived keys and ephemeral private keys are never logged
//! - Tag failures surface as errors and are never retried with another key

pub mod aes_gcm;
pub mod ecdh;
pub mod encryption;
pub mod error;
pub mod key_derivation;
pub mod signature;

pub use aes_gcm::{SymmetricEnvelope, SymmetricFieldCodec};
pub use ecdh::{derive_shared_key, open_sealed, seal_to_public_key, SealedValue};
pub use encryption::{decrypt_with_aead, encrypt_with_aead};
pub use error::CryptoError;
pub use key_derivation::{
    address_to_string, derive_key, normalize_address, parse_address, KeyDerivationParams,
    SymmetricKey,
};
pub use signature::recover_signer;
