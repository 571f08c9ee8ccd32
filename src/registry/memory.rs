// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process registry
//!
//! Behaves like the deployed contract against [`MockFheBackend`]: verifies
//! the input proof for `(registry, sender)`, grants the registry and the
//! sender access to the stored handles, overwrites on resubmission and
//! reports `UserSubmitted` / `UserUpdated`.

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::client::IdentityRegistry;
use super::types::{IdentitySubmission, RegistryEvent, StoredIdentity, SubmissionReceipt};
use crate::errors::Result;
use crate::fhe::encoder::IdentityHandles;
use crate::fhe::handle::CiphertextHandle;
use crate::fhe::mock::MockFheBackend;

/// Protocol id reported by the Sepolia configuration
pub const SEPOLIA_PROTOCOL_ID: u64 = 10001;

#[derive(Default)]
struct RegistryState {
    records: HashMap<Address, StoredIdentity>,
    users: Vec<Address>,
    block_number: u64,
}

pub struct InMemoryRegistry {
    address: Address,
    backend: Arc<MockFheBackend>,
    state: RwLock<RegistryState>,
}

impl InMemoryRegistry {
    pub fn new(address: Address, backend: Arc<MockFheBackend>) -> Self {
        Self {
            address,
            backend,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn backend(&self) -> &Arc<MockFheBackend> {
        &self.backend
    }
}

#[async_trait]
impl IdentityRegistry for InMemoryRegistry {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit_user(
        &self,
        submitter: Address,
        submission: IdentitySubmission,
    ) -> Result<SubmissionReceipt> {
        let handles = submission.handles.to_array();
        self.backend.verify_input_proof(
            self.address,
            submitter,
            &handles,
            &submission.input_proof,
        )?;
        for handle in &handles {
            self.backend.allow(handle, self.address);
            self.backend.allow(handle, submitter);
        }

        let mut state = self.state.write().await;
        state.block_number += 1;
        let block_number = state.block_number;

        let record = StoredIdentity {
            name_ciphertext: submission.name_ciphertext,
            handles: submission.handles,
        };
        let event = match state.records.insert(submitter, record) {
            Some(_) => RegistryEvent::Updated { user: submitter },
            None => {
                state.users.push(submitter);
                RegistryEvent::Submitted { user: submitter }
            }
        };

        let mut preimage = Vec::with_capacity(28);
        preimage.extend_from_slice(&block_number.to_be_bytes());
        preimage.extend_from_slice(submitter.as_bytes());
        let transaction_hash = H256::from(keccak256(preimage));

        info!("{} at block {}", event, block_number);
        Ok(SubmissionReceipt {
            transaction_hash,
            block_number: Some(block_number),
            event,
        })
    }

    async fn has_user(&self, user: Address) -> Result<bool> {
        Ok(self.state.read().await.records.contains_key(&user))
    }

    async fn get_user_info(&self, user: Address) -> Result<StoredIdentity> {
        let state = self.state.read().await;
        // Unset storage reads as empty string and zero handles
        Ok(state.records.get(&user).cloned().unwrap_or_else(|| {
            let zero = CiphertextHandle::from_bytes([0u8; 32]);
            StoredIdentity {
                name_ciphertext: String::new(),
                handles: IdentityHandles {
                    enc_address: zero,
                    birth_year: zero,
                    country_id: zero,
                },
            }
        }))
    }

    async fn get_all_users(&self) -> Result<Vec<Address>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn protocol_id(&self) -> Result<U256> {
        Ok(U256::from(SEPOLIA_PROTOCOL_ID))
    }
}
