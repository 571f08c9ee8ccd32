// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ciphertext handles and input proofs
//!
//! A handle is an opaque 32-byte reference to a ciphertext held by the
//! homomorphic backend. This crate only carries handles; it never
//! interprets their bytes.

use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{IdentityError, Result};

/// Opaque fixed-size reference to a backend-held ciphertext
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            IdentityError::format("handle", format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// `0x`-prefixed hex form used on the wire
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn parse_hex(input: &str) -> Result<Self> {
        let body = input.trim().trim_start_matches("0x");
        let bytes = hex::decode(body)
            .map_err(|e| IdentityError::format("handle", format!("invalid hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", self.to_hex())
    }
}

impl FromStr for CiphertextHandle {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

/// Opaque proof that a batch of handles was produced correctly and is
/// bound to one (contract, submitter) pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(Vec<u8>);

impl InputProof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

impl From<InputProof> for Bytes {
    fn from(proof: InputProof) -> Self {
        Bytes::from(proof.0)
    }
}

/// Encrypted value types the backend understands, with their bit widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FheType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Address,
}

impl FheType {
    pub fn bit_width(&self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 => 64,
            FheType::Address => 160,
        }
    }

    /// Exclusive upper bound of values of this type
    pub fn max_exclusive(&self) -> U256 {
        U256::one() << (self.bit_width() as usize)
    }
}

/// A plaintext value tagged with its encrypted type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedValue {
    pub value: U256,
    pub fhe_type: FheType,
}

impl TypedValue {
    pub fn address(address: Address) -> Self {
        Self {
            value: U256::from_big_endian(address.as_bytes()),
            fhe_type: FheType::Address,
        }
    }

    pub fn fits(&self) -> bool {
        self.value < self.fhe_type.max_exclusive()
    }
}

/// A handle together with the contract it must be looked up under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleContractPair {
    pub handle: CiphertextHandle,
    pub contract_address: Address,
}
