// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Homomorphic backend capability
//!
//! The cryptosystem itself (key generation, proofs, the decryption oracle
//! network) lives outside this crate. Protocol components only talk to it
//! through [`FheBackend`], so tests can inject a deterministic mock.

use async_trait::async_trait;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::crypto::ecdh::SealedValue;
use crate::errors::Result;
use crate::fhe::handle::{CiphertextHandle, HandleContractPair, InputProof, TypedValue};

/// Handles produced for one input batch, in the order the values were added
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInputs {
    pub handles: Vec<CiphertextHandle>,
    pub input_proof: InputProof,
}

/// Wire parameters of a user decryption call
///
/// The backend rebuilds the typed-data payload from these fields and checks
/// the signature against it; it never trusts a locally built payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    pub handle_contract_pairs: Vec<HandleContractPair>,
    /// Ephemeral session public key, `0x`-prefixed hex
    pub public_key: String,
    /// Typed-data signature, hex without `0x`
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    /// Seconds since the Unix epoch, decimal string
    pub start_timestamp: String,
    /// Validity window in days, decimal string
    pub duration_days: String,
}

/// One revealed value, sealed to the session public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedReveal {
    pub handle: CiphertextHandle,
    pub sealed: SealedValue,
}

/// External homomorphic-encryption client
#[async_trait]
pub trait FheBackend: Send + Sync {
    /// Whether the client finished initializing (public key fetched etc.)
    fn is_ready(&self) -> bool;

    /// Encrypt a batch of values bound to `(contract, user)`.
    ///
    /// Returns one handle per value in input order plus the proof covering
    /// the whole batch.
    async fn encrypt_inputs(
        &self,
        contract: Address,
        user: Address,
        values: &[TypedValue],
    ) -> Result<EncryptedInputs>;

    /// Reveal the requested handles to the holder of the session key.
    ///
    /// Handles the backend does not know or will not release are absent from
    /// the result; an invalid grant fails the whole call.
    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<Vec<SealedReveal>>;
}
