// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, H160};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::grant::payload::GrantDomain;

/// Sepolia deployment of the identity registry
/// `0x9FB3DC39F2C0B4aE35fc916c18f5b729C113ea36`
pub const SEPOLIA_REGISTRY: Address = H160([
    0x9f, 0xb3, 0xdc, 0x39, 0xf2, 0xc0, 0xb4, 0xae, 0x35, 0xfc, 0x91, 0x6c, 0x18, 0xf5, 0xb7, 0x29,
    0xc1, 0x13, 0xea, 0x36,
]);

/// Verifying contract of the decryption gateway's typed-data domain
/// `0xb6E160B1ff80D67Bfe90A85eE06Ce0A2613607D1`
pub const DECRYPTION_VERIFYING_CONTRACT: Address = H160([
    0xb6, 0xe1, 0x60, 0xb1, 0xff, 0x80, 0xd6, 0x7b, 0xfe, 0x90, 0xa8, 0x5e, 0xe0, 0x6c, 0xe0, 0xa2,
    0x61, 0x36, 0x07, 0xd1,
]);

pub const GATEWAY_CHAIN_ID: u64 = 55815;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub registry_address: Address,
    pub decryption_verifying_contract: Address,
    pub gateway_chain_id: u64,
}

impl ChainConfig {
    pub fn sepolia() -> Self {
        ChainConfig {
            chain_id: 11155111,
            name: "Sepolia".to_string(),
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            registry_address: SEPOLIA_REGISTRY,
            decryption_verifying_contract: DECRYPTION_VERIFYING_CONTRACT,
            gateway_chain_id: GATEWAY_CHAIN_ID,
        }
    }

    /// Local development node; the registry address must be supplied
    pub fn localhost() -> Self {
        ChainConfig {
            chain_id: 31337,
            name: "Localhost".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            registry_address: Address::zero(),
            decryption_verifying_contract: DECRYPTION_VERIFYING_CONTRACT,
            gateway_chain_id: GATEWAY_CHAIN_ID,
        }
    }

    pub fn grant_domain(&self) -> GrantDomain {
        GrantDomain {
            chain_id: self.gateway_chain_id,
            verifying_contract: self.decryption_verifying_contract,
            ..GrantDomain::default()
        }
    }
}

pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
    default_chain: u64,
}

impl ChainRegistry {
    pub fn new() -> Self {
        let mut chains = HashMap::new();
        chains.insert(11155111, ChainConfig::sepolia());
        chains.insert(31337, ChainConfig::localhost());

        ChainRegistry {
            chains,
            default_chain: 11155111,
        }
    }

    pub fn get_chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn default_chain(&self) -> u64 {
        self.default_chain
    }

    pub fn is_chain_supported(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
