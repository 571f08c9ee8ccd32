// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDSA Signature Recovery
//!
//! Recovers the Ethereum address that produced a typed-data signature. The
//! decryption backend uses this to check that a grant was signed by the
//! user it claims to authorize.

use ethers::types::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tiny_keccak::{Hasher, Keccak};

use crate::crypto::error::CryptoError;

/// Recover the signer's Ethereum address from an ECDSA signature
///
/// # Arguments
///
/// * `signature` - 65-byte compact signature (r + s + v)
///   - Byte 64: recovery ID, 0/1 or Ethereum-style 27/28
/// * `message_hash` - 32-byte digest that was signed (the EIP-712 hash)
///
/// # Errors
///
/// Returns `InvalidSignature` if sizes are wrong, the recovery ID is out of
/// range, or recovery fails.
pub fn recover_signer(signature: &[u8], message_hash: &[u8]) -> Result<Address, CryptoError> {
    let invalid = |reason: String| CryptoError::InvalidSignature {
        operation: "recover_signer".to_string(),
        reason,
    };

    if signature.len() != 65 {
        return Err(invalid(format!(
            "expected 65 bytes, got {}",
            signature.len()
        )));
    }

    if message_hash.len() != 32 {
        return Err(invalid(format!(
            "message hash must be 32 bytes, got {}",
            message_hash.len()
        )));
    }

    let mut recovery_id = signature[64];
    if recovery_id >= 27 {
        recovery_id -= 27;
    }
    if recovery_id > 3 {
        return Err(invalid(format!(
            "recovery ID must be 0-3, got {}",
            recovery_id
        )));
    }

    let recovery_id =
        RecoveryId::try_from(recovery_id).map_err(|e| invalid(e.to_string()))?;
    let parsed =
        Signature::try_from(&signature[..64]).map_err(|e| invalid(e.to_string()))?;

    let verifying_key = VerifyingKey::recover_from_prehash(message_hash, &parsed, recovery_id)
        .map_err(|e| invalid(format!("recovery failed: {}", e)))?;

    Ok(address_from_verifying_key(&verifying_key))
}

/// Ethereum address of a secp256k1 public key: last 20 bytes of
/// Keccak-256 over the uncompressed point without its 0x04 prefix
pub fn address_from_verifying_key(verifying_key: &VerifyingKey) -> Address {
    let public_key = verifying_key.to_encoded_point(false);

    let mut hasher = Keccak::v256();
    let mut hash = [0u8; 32];
    hasher.update(&public_key.as_bytes()[1..]);
    hasher.finalize(&mut hash);

    Address::from_slice(&hash[12..])
}
