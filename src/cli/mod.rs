// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod demo;
pub mod envelope;
pub mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ProtocolConfig;

/// Encrypted identity CLI
#[derive(Parser, Debug)]
#[command(name = "identity-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Tools for the confidential identity registry", long_about = None)]
pub struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true, env = "IDENTITY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt a name for an owner address
    EncryptName(envelope::EncryptNameArgs),

    /// Decrypt a name envelope with the owner address
    DecryptName(envelope::DecryptNameArgs),

    /// Print the typed-data document a wallet signs for a reveal
    GrantPayload(envelope::GrantPayloadArgs),

    /// Show the registry record of one user
    Status(status::StatusArgs),

    /// List all registered users
    Users(status::UsersArgs),

    /// Submit, read and reveal against an in-memory registry
    Demo(demo::DemoArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();
    let config = ProtocolConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::EncryptName(args) => envelope::encrypt_name(args, &config),
        Commands::DecryptName(args) => envelope::decrypt_name(args, &config),
        Commands::GrantPayload(args) => envelope::grant_payload(args, &config),
        Commands::Status(args) => status::show_status(args, &config).await,
        Commands::Users(args) => status::list_users(args, &config).await,
        Commands::Demo(args) => demo::run_demo(args, &config).await,
    }
}
