// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::aes_gcm::SymmetricEnvelope;
use crate::fhe::encoder::IdentityHandles;
use crate::fhe::handle::InputProof;

abigen!(
    EncryptedIdentityRegistry,
    r#"[
        {
            "anonymous": false,
            "inputs": [{"indexed": true, "internalType": "address", "name": "user", "type": "address"}],
            "name": "UserSubmitted",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [{"indexed": true, "internalType": "address", "name": "user", "type": "address"}],
            "name": "UserUpdated",
            "type": "event"
        },
        {
            "inputs": [],
            "name": "getAllUsers",
            "outputs": [{"internalType": "address[]", "name": "", "type": "address[]"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "address", "name": "user", "type": "address"}],
            "name": "getUserInfo",
            "outputs": [
                {"internalType": "string", "name": "nameCiphertext", "type": "string"},
                {"internalType": "bytes32", "name": "encAddr", "type": "bytes32"},
                {"internalType": "bytes32", "name": "birthYear", "type": "bytes32"},
                {"internalType": "bytes32", "name": "countryId", "type": "bytes32"}
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "address", "name": "user", "type": "address"}],
            "name": "hasUser",
            "outputs": [{"internalType": "bool", "name": "", "type": "bool"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "protocolId",
            "outputs": [{"internalType": "uint256", "name": "", "type": "uint256"}],
            "stateMutability": "pure",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "string", "name": "nameCiphertext", "type": "string"},
                {"internalType": "bytes32", "name": "extEncAddress", "type": "bytes32"},
                {"internalType": "bytes32", "name": "extBirthYear", "type": "bytes32"},
                {"internalType": "bytes32", "name": "extCountryId", "type": "bytes32"},
                {"internalType": "bytes", "name": "inputProof", "type": "bytes"}
            ],
            "name": "submitUser",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        }
    ]"#
);

/// Arguments of one `submitUser` call, in contract order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySubmission {
    pub name_ciphertext: String,
    pub handles: IdentityHandles,
    pub input_proof: InputProof,
}

/// Raw `getUserInfo` result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub name_ciphertext: String,
    pub handles: IdentityHandles,
}

/// A decoded registry row for one owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub owner: Address,
    pub name_envelope: SymmetricEnvelope,
    pub handles: IdentityHandles,
}

/// Lifecycle event emitted by a registry write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryEvent {
    Submitted { user: Address },
    Updated { user: Address },
}

impl RegistryEvent {
    pub fn user(&self) -> Address {
        match self {
            RegistryEvent::Submitted { user } | RegistryEvent::Updated { user } => *user,
        }
    }
}

impl fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryEvent::Submitted { user } => write!(f, "UserSubmitted({:?})", user),
            RegistryEvent::Updated { user } => write!(f, "UserUpdated({:?})", user),
        }
    }
}

/// Confirmation of a registry write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub event: RegistryEvent,
}
