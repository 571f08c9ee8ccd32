// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod identity;
pub mod memory;
pub mod types;

pub use client::{IdentityRegistry, OnChainRegistry};
pub use identity::{
    IdentityField, IdentityRegistryClient, PlaintextIdentity, RevealedField,
};
pub use memory::InMemoryRegistry;
pub use types::{
    IdentityRecord, IdentitySubmission, RegistryEvent, StoredIdentity, SubmissionReceipt,
};
