// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory homomorphic backend
//!
//! Deterministic stand-in for the external cryptosystem. It keeps plaintexts
//! in a table keyed by handle and enforces the collaborator contracts the
//! protocol depends on:
//!
//! - input proofs are bound to `(contract, user)` and to the exact handles
//! - an access list per handle, granted by the registry on write
//! - user decryption only for a valid, in-window grant signed by the
//!   requesting user and scoped to the handle's contract
//! - revealed values are sealed to the session public key

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use ethers::utils::keccak256;
use rand::{rngs::OsRng, RngCore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::crypto::ecdh::seal_to_public_key;
use crate::crypto::signature::recover_signer;
use crate::errors::{IdentityError, Result};
use crate::fhe::backend::{EncryptedInputs, FheBackend, SealedReveal, UserDecryptRequest};
use crate::fhe::handle::{CiphertextHandle, FheType, InputProof, TypedValue};
use crate::grant::payload::{GrantDomain, GrantRequest};

const PROOF_TAG_SIZE: usize = 32;

#[derive(Debug, Clone)]
struct StoredCiphertext {
    value: U256,
    fhe_type: FheType,
}

/// Mock implementation of [`FheBackend`] plus the on-chain verifier/ACL hooks
pub struct MockFheBackend {
    domain: GrantDomain,
    proof_secret: [u8; 32],
    ready: AtomicBool,
    online: AtomicBool,
    counter: AtomicU64,
    now_override: RwLock<Option<i64>>,
    ciphertexts: RwLock<HashMap<CiphertextHandle, StoredCiphertext>>,
    acl: RwLock<HashMap<CiphertextHandle, HashSet<Address>>>,
}

impl MockFheBackend {
    pub fn new() -> Self {
        Self::with_domain(GrantDomain::default())
    }

    pub fn with_domain(domain: GrantDomain) -> Self {
        let mut proof_secret = [0u8; 32];
        OsRng.fill_bytes(&mut proof_secret);
        Self {
            domain,
            proof_secret,
            ready: AtomicBool::new(true),
            online: AtomicBool::new(true),
            counter: AtomicU64::new(0),
            now_override: RwLock::new(None),
            ciphertexts: RwLock::new(HashMap::new()),
            acl: RwLock::new(HashMap::new()),
        }
    }

    pub fn domain(&self) -> &GrantDomain {
        &self.domain
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Simulate a network outage: every call fails with `BackendUnavailable`
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Pin the backend clock used for grant window checks
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        *self
            .now_override
            .write()
            .unwrap_or_else(PoisonError::into_inner) = now.map(|t| t.timestamp());
    }

    fn now(&self) -> i64 {
        self.now_override
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or_else(|| Utc::now().timestamp())
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(IdentityError::BackendUnavailable(
                "decryption service unreachable".to_string(),
            ))
        }
    }

    /// Plaintext behind a handle, for assertions in tests
    pub fn plaintext_of(&self, handle: &CiphertextHandle) -> Option<U256> {
        self.ciphertexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .map(|c| c.value)
    }

    fn proof_tag(&self, contract: Address, user: Address, handles: &[CiphertextHandle]) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(32 + 40 + handles.len() * 32);
        preimage.extend_from_slice(&self.proof_secret);
        preimage.extend_from_slice(contract.as_bytes());
        preimage.extend_from_slice(user.as_bytes());
        for handle in handles {
            preimage.extend_from_slice(handle.as_bytes());
        }
        keccak256(preimage)
    }

    /// Check that `proof` attests exactly `handles`, produced for `(contract, user)`
    pub fn verify_input_proof(
        &self,
        contract: Address,
        user: Address,
        handles: &[CiphertextHandle],
        proof: &InputProof,
    ) -> Result<()> {
        let bytes = proof.as_bytes();
        let expected_len = 1 + handles.len() * 32 + PROOF_TAG_SIZE;
        if bytes.len() != expected_len || usize::from(bytes[0]) != handles.len() {
            return Err(IdentityError::format(
                "input proof",
                format!("does not cover {} handles", handles.len()),
            ));
        }
        for (i, handle) in handles.iter().enumerate() {
            let start = 1 + i * 32;
            if &bytes[start..start + 32] != handle.as_bytes() {
                return Err(IdentityError::AccessDenied(format!(
                    "input proof does not attest handle {} at position {}",
                    handle, i
                )));
            }
        }
        let tag = &bytes[bytes.len() - PROOF_TAG_SIZE..];
        if tag != self.proof_tag(contract, user, handles) {
            return Err(IdentityError::AccessDenied(
                "input proof is bound to a different contract or submitter".to_string(),
            ));
        }
        Ok(())
    }

    /// Grant `account` the right to use or reveal `handle`
    pub fn allow(&self, handle: &CiphertextHandle, account: Address) {
        self.acl
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(*handle)
            .or_default()
            .insert(account);
    }

    pub fn is_allowed(&self, handle: &CiphertextHandle, account: &Address) -> bool {
        self.acl
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .map(|accounts| accounts.contains(account))
            .unwrap_or(false)
    }

    fn next_handle(&self, contract: Address, user: Address, index: usize) -> CiphertextHandle {
        let counter = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut preimage = Vec::with_capacity(80);
        preimage.extend_from_slice(&counter.to_be_bytes());
        preimage.extend_from_slice(contract.as_bytes());
        preimage.extend_from_slice(user.as_bytes());
        preimage.extend_from_slice(&(index as u64).to_be_bytes());
        preimage.extend_from_slice(&self.proof_secret[..8]);
        CiphertextHandle::from_bytes(keccak256(preimage))
    }

    fn verify_grant(&self, request: &UserDecryptRequest) -> Result<GrantRequest> {
        if request.signature.starts_with("0x") {
            return Err(IdentityError::format(
                "signature",
                "expected hex without 0x prefix",
            ));
        }
        let signature = hex::decode(&request.signature)
            .map_err(|e| IdentityError::format("signature", format!("invalid hex: {}", e)))?;

        let grant = GrantRequest::from_wire(
            &request.public_key,
            &request.contract_addresses,
            &request.start_timestamp,
            &request.duration_days,
        )?;
        grant.check_window(self.now())?;

        let digest = grant.digest(&self.domain)?;
        let signer = recover_signer(&signature, &digest)?;
        if signer != request.user_address {
            warn!(
                "Rejected user decryption: grant signed by {:?}, requested for {:?}",
                signer, request.user_address
            );
            return Err(IdentityError::AccessDenied(
                "grant was not signed by the requesting user".to_string(),
            ));
        }
        Ok(grant)
    }
}

impl Default for MockFheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FheBackend for MockFheBackend {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn encrypt_inputs(
        &self,
        contract: Address,
        user: Address,
        values: &[TypedValue],
    ) -> Result<EncryptedInputs> {
        self.ensure_online()?;
        if !self.is_ready() {
            return Err(IdentityError::Encoding(
                "encryption backend has not finished initializing".to_string(),
            ));
        }
        if values.len() > usize::from(u8::MAX) {
            return Err(IdentityError::Encoding(format!(
                "batch of {} values exceeds the 255 value limit",
                values.len()
            )));
        }

        let mut handles = Vec::with_capacity(values.len());
        {
            let mut ciphertexts = self
                .ciphertexts
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for (index, typed) in values.iter().enumerate() {
                if !typed.fits() {
                    return Err(IdentityError::Encoding(format!(
                        "value at position {} exceeds {}-bit width",
                        index,
                        typed.fhe_type.bit_width()
                    )));
                }
                let handle = self.next_handle(contract, user, index);
                ciphertexts.insert(
                    handle,
                    StoredCiphertext {
                        value: typed.value,
                        fhe_type: typed.fhe_type,
                    },
                );
                handles.push(handle);
            }
        }

        let mut proof = Vec::with_capacity(1 + handles.len() * 32 + PROOF_TAG_SIZE);
        proof.push(handles.len() as u8);
        for handle in &handles {
            proof.extend_from_slice(handle.as_bytes());
        }
        proof.extend_from_slice(&self.proof_tag(contract, user, &handles));

        debug!("Mock backend encrypted {} values", handles.len());
        Ok(EncryptedInputs {
            handles,
            input_proof: InputProof::new(proof),
        })
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<Vec<SealedReveal>> {
        self.ensure_online()?;
        let grant = self.verify_grant(request)?;

        let public_key = hex::decode(request.public_key.trim_start_matches("0x"))
            .map_err(|e| IdentityError::format("publicKey", e.to_string()))?;

        let mut reveals = Vec::with_capacity(request.handle_contract_pairs.len());
        for pair in &request.handle_contract_pairs {
            if !grant.covers(&pair.contract_address) {
                return Err(IdentityError::GrantScope {
                    contract: format!("{:?}", pair.contract_address),
                });
            }

            let stored = self
                .ciphertexts
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&pair.handle)
                .cloned();
            let Some(stored) = stored else {
                debug!("Unknown handle {}, omitting from result", pair.handle);
                continue;
            };

            if !self.is_allowed(&pair.handle, &request.user_address)
                || !self.is_allowed(&pair.handle, &pair.contract_address)
            {
                return Err(IdentityError::AccessDenied(format!(
                    "{:?} is not allowed to decrypt handle {}",
                    request.user_address, pair.handle
                )));
            }

            let mut plaintext = [0u8; 32];
            stored.value.to_big_endian(&mut plaintext);
            let sealed = seal_to_public_key(&public_key, &plaintext, pair.handle.as_bytes())?;
            debug!(
                "Sealed {:?} value for handle {} to session key",
                stored.fhe_type, pair.handle
            );
            reveals.push(SealedReveal {
                handle: pair.handle,
                sealed,
            });
        }

        info!(
            "Mock backend revealed {}/{} handles to {:?}",
            reveals.len(),
            request.handle_contract_pairs.len(),
            request.user_address
        );
        Ok(reveals)
    }
}
