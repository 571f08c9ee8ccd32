// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity registry client
//!
//! Sequences the codec, the encoder and the grant protocol against a
//! registry. Holds no cryptographic state of its own.

use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use super::client::IdentityRegistry;
use super::types::{IdentityRecord, IdentitySubmission, SubmissionReceipt};
use crate::config::ProtocolConfig;
use crate::country::country_label;
use crate::crypto::aes_gcm::{SymmetricEnvelope, SymmetricFieldCodec};
use crate::crypto::key_derivation::address_to_string;
use crate::errors::{IdentityError, Result};
use crate::fhe::backend::FheBackend;
use crate::fhe::encoder::{HomomorphicFieldEncoder, IdentityFields, IdentityHandles};
use crate::fhe::handle::{CiphertextHandle, HandleContractPair};
use crate::grant::session::{AuthorizationGrantProtocol, RevealSession, RevealedValues};
use crate::grant::signer::TypedDataSigner;

/// Encrypted numeric fields of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    OwnerAddress,
    BirthYear,
    CountryId,
}

impl IdentityField {
    pub const ALL: [IdentityField; 3] = [
        IdentityField::OwnerAddress,
        IdentityField::BirthYear,
        IdentityField::CountryId,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IdentityField::OwnerAddress => "owner_address",
            IdentityField::BirthYear => "birth_year",
            IdentityField::CountryId => "country_id",
        }
    }

    pub fn handle(&self, handles: &IdentityHandles) -> CiphertextHandle {
        match self {
            IdentityField::OwnerAddress => handles.enc_address,
            IdentityField::BirthYear => handles.birth_year,
            IdentityField::CountryId => handles.country_id,
        }
    }
}

/// A numeric field after a reveal: the value, or an explicit gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealedField<T> {
    Revealed(T),
    Unavailable,
}

impl<T: Copy> RevealedField<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            RevealedField::Revealed(v) => Some(*v),
            RevealedField::Unavailable => None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self, RevealedField::Revealed(_))
    }

    pub fn require(&self, field: IdentityField) -> Result<T> {
        self.value().ok_or_else(|| IdentityError::RevealUnavailable {
            field: field.name().to_string(),
        })
    }
}

impl<T: fmt::Display> fmt::Display for RevealedField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevealedField::Revealed(v) => v.fmt(f),
            RevealedField::Unavailable => f.write_str("<unavailable>"),
        }
    }
}

/// Combined plaintext of one identity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextIdentity {
    pub owner: Address,
    pub name: String,
    pub owner_address: RevealedField<Address>,
    pub birth_year: RevealedField<u32>,
    pub country_id: RevealedField<u32>,
}

impl PlaintextIdentity {
    pub fn is_complete(&self) -> bool {
        self.owner_address.is_revealed()
            && self.birth_year.is_revealed()
            && self.country_id.is_revealed()
    }

    pub fn country_label(&self) -> Option<String> {
        self.country_id.value().map(|id| country_label(id).into_owned())
    }
}

pub struct IdentityRegistryClient {
    registry: Arc<dyn IdentityRegistry>,
    backend: Arc<dyn FheBackend>,
    codec: SymmetricFieldCodec,
    encoder: HomomorphicFieldEncoder,
    grants: AuthorizationGrantProtocol,
    submit_locks: HolderLocks,
}

impl IdentityRegistryClient {
    pub fn new(
        registry: Arc<dyn IdentityRegistry>,
        backend: Arc<dyn FheBackend>,
        codec: SymmetricFieldCodec,
        grants: AuthorizationGrantProtocol,
    ) -> Self {
        let encoder = HomomorphicFieldEncoder::new(backend.clone());
        Self {
            registry,
            backend,
            codec,
            encoder,
            grants,
            submit_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(
        registry: Arc<dyn IdentityRegistry>,
        backend: Arc<dyn FheBackend>,
        config: &ProtocolConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            registry,
            backend,
            SymmetricFieldCodec::new(config.key_params()?),
            AuthorizationGrantProtocol::from_config(config),
        ))
    }

    pub fn registry_address(&self) -> Address {
        self.registry.address()
    }

    pub fn codec(&self) -> &SymmetricFieldCodec {
        &self.codec
    }

    pub fn grants(&self) -> &AuthorizationGrantProtocol {
        &self.grants
    }

    fn holder_slot(&self, holder: Address) -> HolderSlot {
        let lock = self
            .submit_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(holder)
            .or_default()
            .clone();
        HolderSlot {
            locks: self.submit_locks.clone(),
            holder,
            lock,
        }
    }

    /// Encrypt and write one identity for `holder`.
    ///
    /// Submissions for the same holder are serialised.
    pub async fn submit(
        &self,
        name: &str,
        birth_year: i64,
        country_id: i64,
        holder: Address,
    ) -> Result<SubmissionReceipt> {
        let slot = self.holder_slot(holder);
        let _guard = slot.lock.lock().await;

        let owner = address_to_string(&holder);
        let envelope = self.codec.encrypt(name, &owner)?;
        debug!("Name envelope ready ({} bytes)", envelope.to_bytes().len());

        let encoded = self
            .encoder
            .encode(
                self.registry.address(),
                holder,
                &IdentityFields {
                    owner_address: holder,
                    birth_year,
                    country_id,
                },
            )
            .await?;

        let receipt = self
            .registry
            .submit_user(
                holder,
                IdentitySubmission {
                    name_ciphertext: envelope.encode(),
                    handles: encoded.handles,
                    input_proof: encoded.input_proof,
                },
            )
            .await?;
        info!("📝 {} ({:?})", receipt.event, receipt.transaction_hash);
        Ok(receipt)
    }

    /// Registry row for `holder`, or `NotFound`
    pub async fn read(&self, holder: Address) -> Result<IdentityRecord> {
        if !self.registry.has_user(holder).await? {
            return Err(IdentityError::NotFound {
                owner: address_to_string(&holder),
            });
        }
        let stored = self.registry.get_user_info(holder).await?;
        Ok(IdentityRecord {
            owner: holder,
            name_envelope: SymmetricEnvelope::decode(&stored.name_ciphertext)?,
            handles: stored.handles,
        })
    }

    pub fn decrypt_name(&self, record: &IdentityRecord, holder: Address) -> Result<String> {
        self.codec
            .decrypt(&record.name_envelope, &address_to_string(&holder))
    }

    /// Sign a fresh grant with `signer` and reveal the whole record
    pub async fn reveal(
        &self,
        record: &IdentityRecord,
        signer: &dyn TypedDataSigner,
    ) -> Result<PlaintextIdentity> {
        let mut session = self
            .grants
            .authorize(signer, vec![self.registry.address()])
            .await?;
        self.reveal_with_session(record, &mut session).await
    }

    /// Reveal the record through an already signed session
    pub async fn reveal_with_session(
        &self,
        record: &IdentityRecord,
        session: &mut RevealSession,
    ) -> Result<PlaintextIdentity> {
        let contract = self.registry.address();
        let pairs: Vec<HandleContractPair> = IdentityField::ALL
            .iter()
            .map(|field| HandleContractPair {
                handle: field.handle(&record.handles),
                contract_address: contract,
            })
            .collect();

        let values = session.reveal(self.backend.as_ref(), &pairs).await?;
        let name = self.decrypt_name(record, record.owner)?;

        let identity = PlaintextIdentity {
            owner: record.owner,
            name,
            owner_address: revealed_address(&values, &record.handles)?,
            birth_year: revealed_u32(&values, &record.handles, IdentityField::BirthYear)?,
            country_id: revealed_u32(&values, &record.handles, IdentityField::CountryId)?,
        };
        if !identity.is_complete() {
            info!("Reveal for {:?} returned partial fields", record.owner);
        }
        Ok(identity)
    }

    pub async fn all_users(&self) -> Result<Vec<Address>> {
        self.registry.get_all_users().await
    }

    pub async fn protocol_id(&self) -> Result<U256> {
        self.registry.protocol_id().await
    }
}

type HolderLocks = Arc<Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>>;

/// Claim on one holder's submission lock; the last claim removes the entry
struct HolderSlot {
    locks: HolderLocks,
    holder: Address,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for HolderSlot {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this slot still reference the lock
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.holder);
        }
    }
}

fn revealed_u32(
    values: &RevealedValues,
    handles: &IdentityHandles,
    field: IdentityField,
) -> Result<RevealedField<u32>> {
    match values.get(&field.handle(handles)) {
        None => Ok(RevealedField::Unavailable),
        Some(v) if v > U256::from(u32::MAX) => Err(IdentityError::format(
            field.name(),
            format!("revealed value {} exceeds 32 bits", v),
        )),
        Some(v) => Ok(RevealedField::Revealed(v.as_u32())),
    }
}

fn revealed_address(
    values: &RevealedValues,
    handles: &IdentityHandles,
) -> Result<RevealedField<Address>> {
    let field = IdentityField::OwnerAddress;
    match values.get(&field.handle(handles)) {
        None => Ok(RevealedField::Unavailable),
        Some(v) if v.bits() > 160 => Err(IdentityError::format(
            field.name(),
            "revealed value exceeds 160 bits",
        )),
        Some(v) => {
            let mut word = [0u8; 32];
            v.to_big_endian(&mut word);
            Ok(RevealedField::Revealed(Address::from_slice(&word[12..])))
        }
    }
}
