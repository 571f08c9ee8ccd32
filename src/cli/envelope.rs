// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Args;

use crate::config::ProtocolConfig;
use crate::crypto::aes_gcm::SymmetricFieldCodec;
use crate::crypto::key_derivation::parse_address;
use crate::errors::IdentityError;
use crate::grant::keypair::AuthorizationKeypair;
use crate::grant::payload::GrantRequest;

/// Arguments for encrypt-name command
#[derive(Args, Debug)]
pub struct EncryptNameArgs {
    /// Plaintext name
    #[arg(long)]
    pub name: String,

    /// Owner address the key is derived from
    #[arg(long)]
    pub address: String,
}

/// Arguments for decrypt-name command
#[derive(Args, Debug)]
pub struct DecryptNameArgs {
    /// Base64 name envelope as stored in the registry
    #[arg(long)]
    pub envelope: String,

    /// Owner address the key is derived from
    #[arg(long)]
    pub address: String,
}

/// Arguments for grant-payload command
#[derive(Args, Debug)]
pub struct GrantPayloadArgs {
    /// Session public key (hex); a fresh one is generated when omitted
    #[arg(long)]
    pub public_key: Option<String>,

    /// Issuance time in seconds since the Unix epoch (defaults to now)
    #[arg(long)]
    pub issued_at: Option<i64>,

    /// Comma-separated registry addresses (defaults to the configured registry)
    #[arg(long, value_delimiter = ',')]
    pub contracts: Vec<String>,
}

pub fn encrypt_name(args: EncryptNameArgs, config: &ProtocolConfig) -> Result<()> {
    let codec = SymmetricFieldCodec::new(config.key_params()?);
    let envelope = codec.encrypt(&args.name, &args.address)?;
    println!("{}", envelope);
    Ok(())
}

pub fn decrypt_name(args: DecryptNameArgs, config: &ProtocolConfig) -> Result<()> {
    let codec = SymmetricFieldCodec::new(config.key_params()?);
    match codec.decrypt_encoded(&args.envelope, &args.address) {
        Ok(name) => {
            println!("{}", name);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {}", e.user_message());
            Err(e.into())
        }
    }
}

pub fn grant_payload(args: GrantPayloadArgs, config: &ProtocolConfig) -> Result<()> {
    let public_key = match args.public_key {
        Some(key) => key,
        None => {
            let keypair = AuthorizationKeypair::generate();
            eprintln!("🔑 Generated session key {}", keypair.public_key_hex());
            keypair.public_key_hex()
        }
    };

    let issued_at = match args.issued_at {
        Some(secs) => Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
            IdentityError::Config(format!("invalid --issued-at {}", secs))
        })?,
        None => Utc::now(),
    };

    let contracts = if args.contracts.is_empty() {
        vec![config.registry_address]
    } else {
        args.contracts
            .iter()
            .map(|c| parse_address(c))
            .collect::<Result<Vec<_>, _>>()?
    };

    let request = GrantRequest::new(
        public_key,
        contracts,
        issued_at,
        config.grant_validity_days,
    )?;
    let typed_data = request.typed_data(&config.grant_domain())?;
    println!("{}", serde_json::to_string_pretty(&typed_data)?);
    Ok(())
}
