// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Protocol configuration
//!
//! Precedence, lowest first: built-in Sepolia defaults, an optional TOML
//! file, then environment variables (with `.env` loaded by the binary).

pub mod chains;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::crypto::key_derivation::{parse_address, KeyDerivationParams, KDF_ITERATIONS, KEY_SALT};
use crate::errors::{IdentityError, Result};
use crate::grant::payload::{GrantDomain, DEFAULT_VALIDITY_DAYS};

pub use chains::{ChainConfig, ChainRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub registry_address: Address,
    pub chain_id: u64,
    pub rpc_url: String,
    pub decryption_verifying_contract: Address,
    pub gateway_chain_id: u64,
    pub key_salt: String,
    pub kdf_iterations: u32,
    pub grant_validity_days: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::for_chain(&ChainConfig::sepolia())
    }
}

impl ProtocolConfig {
    pub fn for_chain(chain: &ChainConfig) -> Self {
        Self {
            registry_address: chain.registry_address,
            chain_id: chain.chain_id,
            rpc_url: chain.rpc_url.clone(),
            decryption_verifying_contract: chain.decryption_verifying_contract,
            gateway_chain_id: chain.gateway_chain_id,
            key_salt: KEY_SALT.to_string(),
            kdf_iterations: KDF_ITERATIONS,
            grant_validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }

    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IdentityError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| IdentityError::Config(format!("invalid TOML: {}", e)))
    }

    /// Apply `IDENTITY_REGISTRY_ADDRESS`, `RPC_URL`, `CHAIN_ID`,
    /// `IDENTITY_KDF_ITERATIONS` and `GRANT_VALIDITY_DAYS`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("IDENTITY_REGISTRY_ADDRESS") {
            self.registry_address = parse_address(&val)?;
        }
        if let Some(val) = lookup("RPC_URL") {
            self.rpc_url = val;
        }
        if let Some(val) = lookup("CHAIN_ID") {
            self.chain_id = parse_number("CHAIN_ID", &val)?;
        }
        if let Some(val) = lookup("IDENTITY_KDF_ITERATIONS") {
            self.kdf_iterations = parse_number("IDENTITY_KDF_ITERATIONS", &val)?;
        }
        if let Some(val) = lookup("GRANT_VALIDITY_DAYS") {
            self.grant_validity_days = parse_number("GRANT_VALIDITY_DAYS", &val)?;
        }
        debug!(
            "Protocol config: registry {:?} on chain {}",
            self.registry_address, self.chain_id
        );
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_salt.is_empty() {
            return Err(IdentityError::Config("key salt must not be empty".to_string()));
        }
        if self.kdf_iterations == 0 {
            return Err(IdentityError::Config(
                "KDF iterations must be greater than 0".to_string(),
            ));
        }
        if self.grant_validity_days == 0 {
            return Err(IdentityError::Config(
                "grant validity must be at least one day".to_string(),
            ));
        }
        Ok(())
    }

    pub fn key_params(&self) -> Result<KeyDerivationParams> {
        KeyDerivationParams::new(self.key_salt.clone(), self.kdf_iterations)
    }

    pub fn grant_domain(&self) -> GrantDomain {
        GrantDomain {
            chain_id: self.gateway_chain_id,
            verifying_contract: self.decryption_verifying_contract,
            ..GrantDomain::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IdentityError::Config(format!("{}={}: {}", key, value, e)))
}
