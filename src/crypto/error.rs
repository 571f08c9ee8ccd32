// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Errors raised by the low-level primitives (ECDH sealing, XChaCha20-Poly1305,
//! ECDSA recovery). Protocol components convert these into
//! [`IdentityError`](crate::errors::IdentityError) at their boundary.
//!
//! ## Error Variants
//!
//! - **DecryptionFailed**: AEAD tag did not verify (wrong key, tampering)
//! - **InvalidSignature**: ECDSA signature parsing or recovery failed
//! - **InvalidKey**: key has the wrong length or is not a curve point
//! - **InvalidNonce**: nonce has the wrong length for the cipher
//! - **KeyDerivationFailed**: ECDH or HKDF failed
//! - **InvalidPayload**: a sealed value or hex field is malformed
//! - **Other**: anything the underlying libraries report that fits nowhere else

use std::fmt;

/// Error type for the low-level cryptographic primitives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD decryption failed
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// ECDSA signature verification or recovery failed
    InvalidSignature {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid cryptographic key
    InvalidKey {
        /// Type of key that failed (e.g., "ephemeral_public_key", "session_private_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid nonce size
    InvalidNonce {
        expected_size: usize,
        actual_size: usize,
    },

    /// Key derivation failed (ECDH or HKDF)
    KeyDerivationFailed {
        operation: String,
        reason: String,
    },

    /// Encrypted payload validation failed
    InvalidPayload {
        /// Which field failed validation
        field: String,
        reason: String,
    },

    Other(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidSignature { operation, reason } => {
                write!(f, "Invalid signature during {}: {}", operation, reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::InvalidNonce {
                expected_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Invalid nonce size: expected {} bytes, got {} bytes",
                    expected_size, actual_size
                )
            }
            CryptoError::KeyDerivationFailed { operation, reason } => {
                write!(f, "Key derivation failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
            CryptoError::Other(msg) => {
                write!(f, "Crypto error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidPayload {
            field: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

impl From<k256::elliptic_curve::Error> for CryptoError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "unknown".to_string(),
            reason: format!("k256 error: {}", err),
        }
    }
}

impl From<chacha20poly1305::aead::Error> for CryptoError {
    fn from(err: chacha20poly1305::aead::Error) -> Self {
        CryptoError::DecryptionFailed {
            operation: "AEAD".to_string(),
            reason: format!("chacha20poly1305 error: {}", err),
        }
    }
}
