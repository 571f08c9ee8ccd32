// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Homomorphic encryption client seam
//!
//! Handles, input batches and the backend trait used by the write path
//! (field encoder) and the read path (user decryption).

pub mod backend;
pub mod encoder;
pub mod handle;
pub mod mock;

pub use backend::{EncryptedInputs, FheBackend, SealedReveal, UserDecryptRequest};
pub use encoder::{
    EncodedIdentity, EncryptedInputBuilder, HomomorphicFieldEncoder, IdentityFields,
    IdentityHandles,
};
pub use handle::{CiphertextHandle, FheType, HandleContractPair, InputProof, TypedValue};
pub use mock::MockFheBackend;
