// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use std::sync::Arc;
use tracing::info;

use crate::config::ProtocolConfig;
use crate::fhe::mock::MockFheBackend;
use crate::grant::signer::{TypedDataSigner, WalletSigner};
use crate::registry::{IdentityRegistryClient, InMemoryRegistry};

/// Arguments for demo command
#[derive(Args, Debug)]
pub struct DemoArgs {
    #[arg(long, default_value = "Alice")]
    pub name: String,

    #[arg(long, default_value_t = 1990)]
    pub birth_year: i64,

    /// Country id (1 USA, 2 China, 3 UK, 4 Germany, 5 France, 86 Other)
    #[arg(long, default_value_t = 86)]
    pub country_id: i64,

    /// Holder key; a random wallet is used when omitted
    #[arg(long, env = "IDENTITY_PRIVATE_KEY")]
    pub private_key: Option<String>,
}

pub async fn run_demo(args: DemoArgs, config: &ProtocolConfig) -> Result<()> {
    let backend = Arc::new(MockFheBackend::with_domain(config.grant_domain()));
    let registry = Arc::new(InMemoryRegistry::new(
        config.registry_address,
        backend.clone(),
    ));
    let client = IdentityRegistryClient::from_config(registry, backend, config)?;

    let signer = match &args.private_key {
        Some(key) => WalletSigner::from_private_key(key)?,
        None => WalletSigner::random(),
    };
    let holder = signer
        .address()
        .ok_or_else(|| anyhow!("wallet has no address"))?;
    info!("Demo holder {:?}", holder);

    let receipt = client
        .submit(&args.name, args.birth_year, args.country_id, holder)
        .await?;
    println!("📝 {} in block {:?}", receipt.event, receipt.block_number);

    let record = client.read(holder).await?;
    println!("🔒 Stored envelope {}", record.name_envelope);

    let identity = client.reveal(&record, &signer).await?;
    println!("🔓 Name:       {}", identity.name);
    println!("   Birth year: {}", identity.birth_year);
    println!(
        "   Country:    {}",
        identity
            .country_label()
            .unwrap_or_else(|| identity.country_id.to_string())
    );
    println!("   Address:    {:?}", identity.owner_address.value());
    Ok(())
}
