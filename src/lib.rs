// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod country;
pub mod crypto;
pub mod errors;
pub mod fhe;
pub mod grant;
pub mod registry;
pub mod version;

pub use config::ProtocolConfig;
pub use crypto::{SymmetricEnvelope, SymmetricFieldCodec};
pub use errors::{IdentityError, Result};
pub use fhe::{CiphertextHandle, FheBackend, HomomorphicFieldEncoder, MockFheBackend};
pub use grant::{AuthorizationGrantProtocol, RevealSession, TypedDataSigner, WalletSigner};
pub use registry::{
    IdentityRecord, IdentityRegistry, IdentityRegistryClient, InMemoryRegistry, OnChainRegistry,
    PlaintextIdentity,
};
