// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Authorization grant protocol
//!
//! Ephemeral keypair, typed-data grant, wallet signature and the reveal
//! exchange with the decryption backend.

pub mod keypair;
pub mod payload;
pub mod session;
pub mod signer;

pub use keypair::AuthorizationKeypair;
pub use payload::{GrantDomain, GrantRequest, SignedGrant, DEFAULT_VALIDITY_DAYS};
pub use session::{AuthorizationGrantProtocol, RevealSession, RevealedValues, SessionState};
pub use signer::{TypedDataSigner, WalletSigner};
