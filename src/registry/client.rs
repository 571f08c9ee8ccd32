// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::*;
use crate::config::ProtocolConfig;
use crate::errors::{IdentityError, Result};
use crate::fhe::encoder::IdentityHandles;
use crate::fhe::handle::CiphertextHandle;

/// Contract surface of the identity registry
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Contract address, used as the grant scope and the handles' lookup key
    fn address(&self) -> Address;

    /// `submitUser` issued by `submitter`
    async fn submit_user(
        &self,
        submitter: Address,
        submission: IdentitySubmission,
    ) -> Result<SubmissionReceipt>;

    async fn has_user(&self, user: Address) -> Result<bool>;

    /// Raw `getUserInfo`; only meaningful after `has_user` returned true
    async fn get_user_info(&self, user: Address) -> Result<StoredIdentity>;

    async fn get_all_users(&self) -> Result<Vec<Address>>;

    async fn protocol_id(&self) -> Result<U256>;
}

type SignerClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// Registry deployed on an EVM chain, reached over JSON-RPC
pub struct OnChainRegistry {
    address: Address,
    provider: Arc<Provider<Http>>,
    reader: EncryptedIdentityRegistry<Provider<Http>>,
    writer: Option<EncryptedIdentityRegistry<SignerClient>>,
    sender: Option<Address>,
}

impl OnChainRegistry {
    /// Connect read-only, or read-write when `private_key` is given
    pub async fn connect(config: &ProtocolConfig, private_key: Option<&str>) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| IdentityError::Config(format!("invalid RPC URL: {}", e)))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| IdentityError::BackendUnavailable(format!("RPC unreachable: {}", e)))?;
        if chain_id.as_u64() != config.chain_id {
            return Err(IdentityError::Config(format!(
                "Chain ID mismatch: expected {}, got {}",
                config.chain_id, chain_id
            )));
        }

        let provider = Arc::new(provider);
        let reader = EncryptedIdentityRegistry::new(config.registry_address, provider.clone());

        let (writer, sender) = match private_key {
            Some(key) => {
                let wallet = key
                    .trim()
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()
                    .map_err(|e| {
                        IdentityError::SignerUnavailable(format!("invalid private key: {}", e))
                    })?
                    .with_chain_id(config.chain_id);
                let sender = wallet.address();
                let client = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
                (
                    Some(EncryptedIdentityRegistry::new(config.registry_address, client)),
                    Some(sender),
                )
            }
            None => (None, None),
        };

        info!(
            "Connected to identity registry {:?} on chain {}",
            config.registry_address, config.chain_id
        );
        Ok(Self {
            address: config.registry_address,
            provider,
            reader,
            writer,
            sender,
        })
    }

    pub async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| IdentityError::BackendUnavailable(e.to_string()))
    }

    fn event_from_receipt(&self, receipt: &TransactionReceipt, user: Address) -> RegistryEvent {
        let updated = UserUpdatedFilter::signature();
        for log in receipt.logs.iter().filter(|l| l.address == self.address) {
            if log.topics.first() == Some(&updated) {
                return RegistryEvent::Updated { user };
            }
        }
        RegistryEvent::Submitted { user }
    }
}

fn map_contract_error<M: Middleware>(err: ContractError<M>) -> IdentityError {
    match err {
        ContractError::Revert(data) => {
            IdentityError::AccessDenied(format!("registry reverted: 0x{}", hex::encode(&data)))
        }
        other => IdentityError::BackendUnavailable(other.to_string()),
    }
}

#[async_trait]
impl IdentityRegistry for OnChainRegistry {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit_user(
        &self,
        submitter: Address,
        submission: IdentitySubmission,
    ) -> Result<SubmissionReceipt> {
        let writer = self.writer.as_ref().ok_or_else(|| {
            IdentityError::SignerUnavailable("registry opened read-only".to_string())
        })?;
        if self.sender != Some(submitter) {
            return Err(IdentityError::AccessDenied(format!(
                "configured wallet cannot submit for {:?}",
                submitter
            )));
        }

        let IdentitySubmission {
            name_ciphertext,
            handles,
            input_proof,
        } = submission;
        let call = writer.submit_user(
            name_ciphertext,
            handles.enc_address.to_bytes(),
            handles.birth_year.to_bytes(),
            handles.country_id.to_bytes(),
            input_proof.into(),
        );

        let pending_tx = call.send().await.map_err(map_contract_error)?;
        let tx_hash = pending_tx.tx_hash();
        debug!("submitUser sent: {:?}", tx_hash);

        let receipt = pending_tx
            .await
            .map_err(|e| IdentityError::BackendUnavailable(e.to_string()))?
            .ok_or_else(|| {
                IdentityError::BackendUnavailable(format!("transaction {:?} dropped", tx_hash))
            })?;
        if receipt.status == Some(U64::zero()) {
            warn!("submitUser {:?} reverted", tx_hash);
            return Err(IdentityError::AccessDenied(format!(
                "submitUser transaction {:?} reverted",
                tx_hash
            )));
        }

        let event = self.event_from_receipt(&receipt, submitter);
        info!("✅ {} in block {:?}", event, receipt.block_number);
        Ok(SubmissionReceipt {
            transaction_hash: tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            event,
        })
    }

    async fn has_user(&self, user: Address) -> Result<bool> {
        self.reader
            .has_user(user)
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn get_user_info(&self, user: Address) -> Result<StoredIdentity> {
        let (name_ciphertext, enc_address, birth_year, country_id) = self
            .reader
            .get_user_info(user)
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(StoredIdentity {
            name_ciphertext,
            handles: IdentityHandles {
                enc_address: CiphertextHandle::from_bytes(enc_address),
                birth_year: CiphertextHandle::from_bytes(birth_year),
                country_id: CiphertextHandle::from_bytes(country_id),
            },
        })
    }

    async fn get_all_users(&self) -> Result<Vec<Address>> {
        self.reader
            .get_all_users()
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn protocol_id(&self) -> Result<U256> {
        self.reader
            .protocol_id()
            .call()
            .await
            .map_err(map_contract_error)
    }
}
