// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Typed-data authorization payload
//!
//! The wallet signs an EIP-712 `UserDecryptRequestVerification` message so it
//! can show the user what is being authorized: the session public key, the
//! registry addresses in scope, and the validity window. The decryption
//! backend rebuilds the same payload from the wire fields of the reveal call
//! and checks the signature against it.

use chrono::{DateTime, Utc};
use ethers::types::transaction::eip712::{Eip712, TypedData};
use ethers::types::{Address, Signature};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::chains::{DECRYPTION_VERIFYING_CONTRACT, GATEWAY_CHAIN_ID};
use crate::crypto::key_derivation::address_to_string;
use crate::errors::{IdentityError, Result};

/// Primary type name of the authorization message
pub const USER_DECRYPT_TYPE: &str = "UserDecryptRequestVerification";

/// Default validity window of a grant
pub const DEFAULT_VALIDITY_DAYS: u32 = 10;

const SECONDS_PER_DAY: i64 = 86_400;

/// EIP-712 domain of the decryption service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for GrantDomain {
    fn default() -> Self {
        Self {
            name: "Decryption".to_string(),
            version: "1".to_string(),
            chain_id: GATEWAY_CHAIN_ID,
            verifying_contract: DECRYPTION_VERIFYING_CONTRACT,
        }
    }
}

/// Unsigned authorization: what the wallet is asked to approve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    /// Session public key, `0x`-prefixed hex
    pub public_key: String,
    pub contract_addresses: Vec<Address>,
    /// Issuance time, seconds since the Unix epoch
    pub start_timestamp: i64,
    pub duration_days: u32,
}

impl GrantRequest {
    pub fn new(
        public_key: impl Into<String>,
        contract_addresses: Vec<Address>,
        issued_at: DateTime<Utc>,
        duration_days: u32,
    ) -> Result<Self> {
        let public_key = public_key.into();
        validate_public_key(&public_key)?;
        if contract_addresses.is_empty() {
            return Err(IdentityError::GrantScope {
                contract: "<none>".to_string(),
            });
        }
        if duration_days == 0 {
            return Err(IdentityError::Config(
                "grant validity must be at least one day".to_string(),
            ));
        }
        let request = Self {
            public_key,
            contract_addresses,
            start_timestamp: issued_at.timestamp(),
            duration_days,
        };
        request.expires_at()?;
        Ok(request)
    }

    /// Rebuild a request from the string fields of a reveal call
    pub fn from_wire(
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: &str,
        duration_days: &str,
    ) -> Result<Self> {
        validate_public_key(public_key)?;
        let start_timestamp = start_timestamp.trim().parse::<i64>().map_err(|e| {
            IdentityError::format("startTimestamp", format!("not a decimal integer: {}", e))
        })?;
        let duration_days = duration_days.trim().parse::<u32>().map_err(|e| {
            IdentityError::format("durationDays", format!("not a decimal integer: {}", e))
        })?;
        if start_timestamp < 0 {
            return Err(IdentityError::format(
                "startTimestamp",
                "must not be negative",
            ));
        }
        let request = Self {
            public_key: public_key.to_string(),
            contract_addresses: contract_addresses.to_vec(),
            start_timestamp,
            duration_days,
        };
        request.expires_at()?;
        Ok(request)
    }

    /// End of the window; fails if it does not fit in an `i64`
    pub fn expires_at(&self) -> Result<i64> {
        i64::from(self.duration_days)
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|window| self.start_timestamp.checked_add(window))
            .ok_or_else(|| {
                IdentityError::format("startTimestamp", "validity window overflows")
            })
    }

    /// Whether `now` (seconds) lies in `[start, start + duration)`
    pub fn is_valid_at(&self, now: i64) -> bool {
        match self.expires_at() {
            Ok(expires_at) => now >= self.start_timestamp && now < expires_at,
            Err(_) => false,
        }
    }

    /// Fail with `GrantExpired` unless `now` is inside the window
    pub fn check_window(&self, now: i64) -> Result<()> {
        let expires_at = self.expires_at()?;
        if now >= self.start_timestamp && now < expires_at {
            Ok(())
        } else {
            Err(IdentityError::GrantExpired {
                not_before: self.start_timestamp,
                expires_at,
                now,
            })
        }
    }

    pub fn covers(&self, contract: &Address) -> bool {
        self.contract_addresses.contains(contract)
    }

    /// The EIP-712 document presented to the wallet
    pub fn typed_data(&self, domain: &GrantDomain) -> Result<TypedData> {
        let contract_addresses: Vec<String> = self
            .contract_addresses
            .iter()
            .map(address_to_string)
            .collect();

        let document = json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "UserDecryptRequestVerification": [
                    { "name": "publicKey", "type": "bytes" },
                    { "name": "contractAddresses", "type": "address[]" },
                    { "name": "startTimestamp", "type": "uint256" },
                    { "name": "durationDays", "type": "uint256" }
                ]
            },
            "primaryType": USER_DECRYPT_TYPE,
            "domain": {
                "name": domain.name,
                "version": domain.version,
                "chainId": domain.chain_id,
                "verifyingContract": address_to_string(&domain.verifying_contract)
            },
            "message": {
                "publicKey": self.public_key,
                "contractAddresses": contract_addresses,
                "startTimestamp": self.start_timestamp.to_string(),
                "durationDays": self.duration_days.to_string()
            }
        });

        serde_json::from_value(document)
            .map_err(|e| IdentityError::format("typed data", e.to_string()))
    }

    /// EIP-712 digest the wallet signs
    pub fn digest(&self, domain: &GrantDomain) -> Result<[u8; 32]> {
        self.typed_data(domain)?
            .encode_eip712()
            .map_err(|e| IdentityError::format("typed data", e.to_string()))
    }
}

fn validate_public_key(public_key: &str) -> Result<()> {
    let body = public_key.strip_prefix("0x").unwrap_or(public_key);
    let bytes = hex::decode(body)
        .map_err(|e| IdentityError::format("publicKey", format!("invalid hex: {}", e)))?;
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(IdentityError::format(
            "publicKey",
            format!("expected 33 or 65 bytes, got {}", bytes.len()),
        ));
    }
    Ok(())
}

/// A request plus the owner's typed-data signature over it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedGrant {
    pub request: GrantRequest,
    pub signature: Signature,
    pub signer: Address,
}

impl SignedGrant {
    /// Signature hex without the `0x` prefix, as the reveal call expects
    pub fn signature_hex(&self) -> String {
        hex::encode(self.signature.to_vec())
    }
}
