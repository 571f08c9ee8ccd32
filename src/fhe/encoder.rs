// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Homomorphic field encoder
//!
//! Write-path adapter that turns the numeric identity fields into ciphertext
//! handles plus one input proof. The registry contract decodes the batch
//! positionally, so the order is fixed by [`IdentityHandles`]:
//! submitter address, birth year, country id.

use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{IdentityError, Result};
use crate::fhe::backend::{EncryptedInputs, FheBackend};
use crate::fhe::handle::{CiphertextHandle, FheType, InputProof, TypedValue};

/// Accumulates typed values for one `(contract, user)` batch
pub struct EncryptedInputBuilder<'a> {
    backend: &'a dyn FheBackend,
    contract: Address,
    user: Address,
    values: Vec<TypedValue>,
}

impl<'a> EncryptedInputBuilder<'a> {
    pub fn new(backend: &'a dyn FheBackend, contract: Address, user: Address) -> Self {
        Self {
            backend,
            contract,
            user,
            values: Vec::new(),
        }
    }

    pub fn add_address(&mut self, address: Address) -> &mut Self {
        self.values.push(TypedValue::address(address));
        self
    }

    /// Add an unsigned integer, rejecting values outside `0 <= v < 2^width`
    pub fn add_uint(&mut self, value: i128, fhe_type: FheType) -> Result<&mut Self> {
        if fhe_type == FheType::Address {
            return Err(IdentityError::Encoding(
                "use add_address for address fields".to_string(),
            ));
        }
        if value < 0 {
            return Err(IdentityError::Encoding(format!(
                "value {} is negative, {:?} fields are unsigned",
                value, fhe_type
            )));
        }
        let typed = TypedValue {
            value: U256::from(value as u128),
            fhe_type,
        };
        if !typed.fits() {
            return Err(IdentityError::Encoding(format!(
                "value {} exceeds {}-bit width",
                value,
                fhe_type.bit_width()
            )));
        }
        self.values.push(typed);
        Ok(self)
    }

    pub fn add32(&mut self, value: i64) -> Result<&mut Self> {
        self.add_uint(i128::from(value), FheType::Uint32)
    }

    pub fn add64(&mut self, value: i128) -> Result<&mut Self> {
        self.add_uint(value, FheType::Uint64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encrypt the accumulated batch
    pub async fn encrypt(self) -> Result<EncryptedInputs> {
        if !self.backend.is_ready() {
            return Err(IdentityError::Encoding(
                "encryption backend has not finished initializing".to_string(),
            ));
        }
        if self.values.is_empty() {
            return Err(IdentityError::Encoding("empty input batch".to_string()));
        }

        debug!(
            "Encrypting {} input values for contract {:?}, user {:?}",
            self.values.len(),
            self.contract,
            self.user
        );
        let inputs = self
            .backend
            .encrypt_inputs(self.contract, self.user, &self.values)
            .await?;

        if inputs.handles.len() != self.values.len() {
            return Err(IdentityError::format(
                "encrypted inputs",
                format!(
                    "backend returned {} handles for {} values",
                    inputs.handles.len(),
                    self.values.len()
                ),
            ));
        }
        Ok(inputs)
    }
}

/// Plaintext numeric fields of one identity submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityFields {
    pub owner_address: Address,
    pub birth_year: i64,
    pub country_id: i64,
}

/// Handles of one identity, in the registry's positional order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityHandles {
    pub enc_address: CiphertextHandle,
    pub birth_year: CiphertextHandle,
    pub country_id: CiphertextHandle,
}

impl IdentityHandles {
    pub fn to_array(&self) -> [CiphertextHandle; 3] {
        [self.enc_address, self.birth_year, self.country_id]
    }
}

/// Handles plus the proof binding them to the submitter and registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedIdentity {
    pub handles: IdentityHandles,
    pub input_proof: InputProof,
}

/// Encodes identity fields through an injected [`FheBackend`]
#[derive(Clone)]
pub struct HomomorphicFieldEncoder {
    backend: Arc<dyn FheBackend>,
}

impl HomomorphicFieldEncoder {
    pub fn new(backend: Arc<dyn FheBackend>) -> Self {
        Self { backend }
    }

    pub fn builder(&self, contract: Address, user: Address) -> EncryptedInputBuilder<'_> {
        EncryptedInputBuilder::new(self.backend.as_ref(), contract, user)
    }

    /// Encode the three numeric fields for `submitter` on `registry`
    pub async fn encode(
        &self,
        registry: Address,
        submitter: Address,
        fields: &IdentityFields,
    ) -> Result<EncodedIdentity> {
        let mut builder = self.builder(registry, submitter);
        builder.add_address(fields.owner_address);
        builder.add32(fields.birth_year)?;
        builder.add32(fields.country_id)?;

        let inputs = builder.encrypt().await?;
        let handles = match inputs.handles.as_slice() {
            [enc_address, birth_year, country_id] => IdentityHandles {
                enc_address: *enc_address,
                birth_year: *birth_year,
                country_id: *country_id,
            },
            other => {
                return Err(IdentityError::format(
                    "encrypted inputs",
                    format!("expected 3 handles, got {}", other.len()),
                ))
            }
        };

        info!(
            "🔐 Encoded identity fields for {:?} ({} proof bytes)",
            submitter,
            inputs.input_proof.as_bytes().len()
        );
        Ok(EncodedIdentity {
            handles,
            input_proof: inputs.input_proof,
        })
    }
}
