// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use tracing::warn;

use crate::config::ProtocolConfig;
use crate::crypto::aes_gcm::SymmetricFieldCodec;
use crate::crypto::key_derivation::{address_to_string, parse_address};
use crate::registry::{IdentityRegistry, OnChainRegistry};

/// Arguments for status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// User address to look up
    #[arg(long)]
    pub user: String,

    /// Also decrypt the name locally with the user's address
    #[arg(long)]
    pub decrypt_name: bool,
}

/// Arguments for users command
#[derive(Args, Debug)]
pub struct UsersArgs {
    /// Print only the number of users
    #[arg(long)]
    pub count: bool,
}

pub async fn show_status(args: StatusArgs, config: &ProtocolConfig) -> Result<()> {
    let user = parse_address(&args.user)?;
    let registry = OnChainRegistry::connect(config, None).await?;

    println!("📋 Registry {:?} (chain {})", registry.address(), config.chain_id);
    if !registry.has_user(user).await? {
        println!("No record yet for {}", address_to_string(&user));
        return Ok(());
    }

    let stored = registry.get_user_info(user).await?;
    println!("User:          {}", address_to_string(&user));
    println!("Name envelope: {}", stored.name_ciphertext);
    println!("Address handle:    {}", stored.handles.enc_address);
    println!("Birth year handle: {}", stored.handles.birth_year);
    println!("Country handle:    {}", stored.handles.country_id);

    if args.decrypt_name {
        let codec = SymmetricFieldCodec::new(config.key_params()?);
        match codec.decrypt_encoded(&stored.name_ciphertext, &address_to_string(&user)) {
            Ok(name) => println!("Name:          {}", name),
            Err(e) => warn!("Could not decrypt name ({}): {}", e.error_code(), e),
        }
    }
    Ok(())
}

pub async fn list_users(args: UsersArgs, config: &ProtocolConfig) -> Result<()> {
    let registry = OnChainRegistry::connect(config, None).await?;
    let users = registry.get_all_users().await?;

    if args.count {
        println!("{}", users.len());
        return Ok(());
    }

    let protocol_id = registry.protocol_id().await?;
    println!(
        "👥 {} registered user(s) on {:?} (protocol {})",
        users.len(),
        registry.address(),
        protocol_id
    );
    for user in users {
        println!("  {}", address_to_string(&user));
    }
    Ok(())
}
