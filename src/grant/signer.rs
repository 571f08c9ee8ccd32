// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet signing capability
//!
//! The protocol never holds wallet logic. Callers hand in something that can
//! sign a typed-data document; a local key wallet is provided for the CLI
//! and tests.

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature};
use tracing::debug;

use crate::errors::{IdentityError, Result};

/// Something that can sign an EIP-712 document on behalf of one account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// Connected account, `None` when no wallet session exists
    fn address(&self) -> Option<Address>;

    /// Ask the holder to sign `payload`.
    ///
    /// Fails with `UserRejected` if the holder declines and with
    /// `SignerUnavailable` when nothing is connected.
    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature>;
}

/// Signer backed by an in-process private key
#[derive(Debug, Clone)]
pub struct WalletSigner {
    wallet: Option<LocalWallet>,
}

impl WalletSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet: Some(wallet),
        }
    }

    /// A signer with no connected wallet
    pub fn disconnected() -> Self {
        Self { wallet: None }
    }

    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| IdentityError::SignerUnavailable(format!("invalid private key: {}", e)))?;
        Ok(Self::new(wallet))
    }

    pub fn random() -> Self {
        Self::new(LocalWallet::new(&mut rand::thread_rng()))
    }
}

#[async_trait]
impl TypedDataSigner for WalletSigner {
    fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature> {
        let wallet = self.wallet.as_ref().ok_or_else(|| {
            IdentityError::SignerUnavailable("no wallet connected".to_string())
        })?;
        debug!("Signing {} for {:?}", payload.primary_type, wallet.address());
        wallet
            .sign_typed_data(payload)
            .await
            .map_err(|e| IdentityError::format("typed data", e.to_string()))
    }
}
