// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the confidential identity protocol
//!
//! One taxonomy covers every component:
//! - Envelope and handle format errors
//! - AEAD authentication failures (never retried with another key)
//! - Numeric encoding errors (width overflow, backend not initialized)
//! - Human-in-the-loop signing failures
//! - Reveal gaps, backend/network failures and registry absence

use thiserror::Error;

use crate::crypto::error::CryptoError;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Errors surfaced by the identity protocol components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Malformed envelope, handle, proof or wire field
    #[error("Malformed {what}: {reason}")]
    Format { what: String, reason: String },

    /// AEAD tag did not verify: wrong key, corrupted or tampered data
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Numeric field outside its declared width, or encoder not ready
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The wallet declined to sign the authorization payload
    #[error("Signature request rejected by the user")]
    UserRejected,

    /// No wallet or signing session is connected
    #[error("No signer available: {0}")]
    SignerUnavailable(String),

    /// The decryption backend returned no plaintext for this field
    #[error("Reveal unavailable for field '{field}'")]
    RevealUnavailable { field: String },

    /// Network or service failure while encoding, revealing or writing
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The decryption backend or registry refused the caller
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The registry holds no record for this owner
    #[error("No identity registered for {owner}")]
    NotFound { owner: String },

    /// Address input failed validation before any derivation
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// The grant's validity window does not cover the current time
    #[error("Authorization grant outside its validity window (valid {not_before}..{expires_at}, now {now})")]
    GrantExpired {
        not_before: i64,
        expires_at: i64,
        now: i64,
    },

    /// The grant was not signed for this registry address
    #[error("Authorization grant does not cover contract {contract}")]
    GrantScope { contract: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IdentityError {
    pub fn format(what: impl Into<String>, reason: impl Into<String>) -> Self {
        IdentityError::Format {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Get user-friendly error message for display
    pub fn user_message(&self) -> String {
        match self {
            IdentityError::Authentication(_) => {
                "Could not decrypt: the data was not encrypted for this address or was altered"
                    .to_string()
            }
            IdentityError::UserRejected => "Signature request was declined".to_string(),
            IdentityError::SignerUnavailable(_) => "Please connect your wallet".to_string(),
            IdentityError::NotFound { .. } => {
                "No record yet. Submit your info first.".to_string()
            }
            IdentityError::RevealUnavailable { field } => {
                format!("The value for '{}' could not be revealed", field)
            }
            IdentityError::GrantExpired { .. } => {
                "Decryption authorization expired, please sign again".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            IdentityError::Format { .. } => "FORMAT_ERROR",
            IdentityError::Authentication(_) => "AUTHENTICATION_ERROR",
            IdentityError::Encoding(_) => "ENCODING_ERROR",
            IdentityError::UserRejected => "USER_REJECTED",
            IdentityError::SignerUnavailable(_) => "SIGNER_UNAVAILABLE",
            IdentityError::RevealUnavailable { .. } => "REVEAL_UNAVAILABLE",
            IdentityError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            IdentityError::AccessDenied(_) => "ACCESS_DENIED",
            IdentityError::NotFound { .. } => "NOT_FOUND",
            IdentityError::InvalidAddress { .. } => "INVALID_ADDRESS",
            IdentityError::GrantExpired { .. } => "GRANT_EXPIRED",
            IdentityError::GrantScope { .. } => "GRANT_SCOPE",
            IdentityError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the orchestrating layer may offer the user a retry.
    /// The protocol itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IdentityError::BackendUnavailable(_)
                | IdentityError::SignerUnavailable(_)
                | IdentityError::UserRejected
        )
    }
}

impl From<CryptoError> for IdentityError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed { operation, reason } => {
                IdentityError::Authentication(format!("{}: {}", operation, reason))
            }
            CryptoError::InvalidSignature { operation, reason } => {
                IdentityError::AccessDenied(format!("{}: {}", operation, reason))
            }
            CryptoError::InvalidKey { key_type, reason } => IdentityError::format(key_type, reason),
            CryptoError::InvalidNonce {
                expected_size,
                actual_size,
            } => IdentityError::format(
                "nonce",
                format!("expected {} bytes, got {}", expected_size, actual_size),
            ),
            CryptoError::KeyDerivationFailed { operation, reason } => {
                IdentityError::format(operation, reason)
            }
            CryptoError::InvalidPayload { field, reason } => IdentityError::format(field, reason),
            CryptoError::Other(msg) => IdentityError::format("crypto", msg),
        }
    }
}
