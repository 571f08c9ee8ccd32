// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Authorization-gated reveal sessions
//!
//! A session walks `Idle -> KeypairGenerated -> GrantSigned -> Decrypting`
//! and ends in `Revealed` or `Failed`. The signed grant is scoped to registry
//! addresses, not handles, so one session may reveal several batches while
//! its window is open. Nothing here retries: backend failures surface to the
//! caller.

use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::ProtocolConfig;
use crate::crypto::signature::recover_signer;
use crate::errors::{IdentityError, Result};
use crate::fhe::backend::{FheBackend, UserDecryptRequest};
use crate::fhe::handle::{CiphertextHandle, HandleContractPair};
use crate::grant::keypair::AuthorizationKeypair;
use crate::grant::payload::{GrantDomain, GrantRequest, SignedGrant, DEFAULT_VALIDITY_DAYS};
use crate::grant::signer::TypedDataSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    KeypairGenerated,
    GrantSigned,
    Decrypting,
    Revealed,
    Failed,
}

impl SessionState {
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Idle, KeypairGenerated) => true,
            (KeypairGenerated, GrantSigned) => true,
            (KeypairGenerated, Failed) => true,
            (GrantSigned, Decrypting) => true,
            (Decrypting, Revealed) => true,
            (Decrypting, Failed) => true,

            // Same grant, another batch
            (Revealed, Decrypting) => true,
            (Failed, Decrypting) => true,

            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::KeypairGenerated => "keypair_generated",
            SessionState::GrantSigned => "grant_signed",
            SessionState::Decrypting => "decrypting",
            SessionState::Revealed => "revealed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Builds signed reveal sessions for one decryption domain
#[derive(Debug, Clone)]
pub struct AuthorizationGrantProtocol {
    domain: GrantDomain,
    validity_days: u32,
}

impl Default for AuthorizationGrantProtocol {
    fn default() -> Self {
        Self::new(GrantDomain::default(), DEFAULT_VALIDITY_DAYS)
    }
}

impl AuthorizationGrantProtocol {
    pub fn new(domain: GrantDomain, validity_days: u32) -> Self {
        Self {
            domain,
            validity_days,
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.grant_domain(), config.grant_validity_days)
    }

    pub fn domain(&self) -> &GrantDomain {
        &self.domain
    }

    pub fn validity_days(&self) -> u32 {
        self.validity_days
    }

    /// Generate a session keypair and have `signer` authorize it for `scope`
    pub async fn authorize(
        &self,
        signer: &dyn TypedDataSigner,
        scope: Vec<Address>,
    ) -> Result<RevealSession> {
        self.authorize_at(signer, scope, Utc::now()).await
    }

    pub async fn authorize_at(
        &self,
        signer: &dyn TypedDataSigner,
        scope: Vec<Address>,
        issued_at: DateTime<Utc>,
    ) -> Result<RevealSession> {
        let holder = signer.address().ok_or_else(|| {
            IdentityError::SignerUnavailable("no wallet connected".to_string())
        })?;

        let keypair = AuthorizationKeypair::generate();
        let mut state = SessionState::Idle;
        advance(&mut state, SessionState::KeypairGenerated)?;

        let request = GrantRequest::new(
            keypair.public_key_hex(),
            scope,
            issued_at,
            self.validity_days,
        )?;
        let payload = request.typed_data(&self.domain)?;

        debug!(
            "Requesting typed-data signature from {:?} for {} contract(s)",
            holder,
            request.contract_addresses.len()
        );
        let signature = match signer.sign_typed_data(&payload).await {
            Ok(signature) => signature,
            Err(e) => {
                warn!("Grant signing failed for {:?}: {}", holder, e);
                return Err(e);
            }
        };

        let digest = request.digest(&self.domain)?;
        let recovered = recover_signer(&signature.to_vec(), &digest)?;
        if recovered != holder {
            return Err(IdentityError::AccessDenied(format!(
                "grant signed by {:?}, expected {:?}",
                recovered, holder
            )));
        }
        advance(&mut state, SessionState::GrantSigned)?;

        let expires_at = request.expires_at()?;
        info!(
            "✍️ Grant signed by {:?}, valid {}..{}",
            holder, request.start_timestamp, expires_at
        );
        Ok(RevealSession {
            keypair,
            grant: SignedGrant {
                request,
                signature,
                signer: holder,
            },
            state,
        })
    }
}

fn advance(state: &mut SessionState, next: SessionState) -> Result<()> {
    if !state.can_transition_to(next) {
        return Err(IdentityError::format(
            "session state",
            format!("cannot move from {} to {}", state, next),
        ));
    }
    *state = next;
    Ok(())
}

/// A signed grant plus the keypair it authorizes
///
/// Dropping the session drops the private key.
#[derive(Debug)]
pub struct RevealSession {
    keypair: AuthorizationKeypair,
    grant: SignedGrant,
    state: SessionState,
}

impl RevealSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn grant(&self) -> &SignedGrant {
        &self.grant
    }

    pub fn holder(&self) -> Address {
        self.grant.signer
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn expires_at(&self) -> Result<i64> {
        self.grant.request.expires_at()
    }

    /// Reveal `pairs` through `backend` using this session's grant
    pub async fn reveal(
        &mut self,
        backend: &dyn FheBackend,
        pairs: &[HandleContractPair],
    ) -> Result<RevealedValues> {
        self.reveal_at(backend, pairs, Utc::now()).await
    }

    pub async fn reveal_at(
        &mut self,
        backend: &dyn FheBackend,
        pairs: &[HandleContractPair],
        now: DateTime<Utc>,
    ) -> Result<RevealedValues> {
        advance(&mut self.state, SessionState::Decrypting)?;
        match self.run_reveal(backend, pairs, now.timestamp()).await {
            Ok(values) => {
                advance(&mut self.state, SessionState::Revealed)?;
                Ok(values)
            }
            Err(e) => {
                advance(&mut self.state, SessionState::Failed)?;
                warn!("Reveal failed ({}): {}", e.error_code(), e);
                Err(e)
            }
        }
    }

    async fn run_reveal(
        &self,
        backend: &dyn FheBackend,
        pairs: &[HandleContractPair],
        now: i64,
    ) -> Result<RevealedValues> {
        let request = &self.grant.request;
        request.check_window(now)?;
        if let Some(pair) = pairs.iter().find(|p| !request.covers(&p.contract_address)) {
            return Err(IdentityError::GrantScope {
                contract: format!("{:?}", pair.contract_address),
            });
        }
        if pairs.is_empty() {
            return Ok(RevealedValues::default());
        }

        let call = UserDecryptRequest {
            handle_contract_pairs: pairs.to_vec(),
            public_key: self.keypair.public_key_hex(),
            signature: self.grant.signature_hex(),
            contract_addresses: request.contract_addresses.clone(),
            user_address: self.grant.signer,
            start_timestamp: request.start_timestamp.to_string(),
            duration_days: request.duration_days.to_string(),
        };
        let sealed = backend.user_decrypt(&call).await?;

        let mut values = HashMap::with_capacity(sealed.len());
        for reveal in &sealed {
            if !pairs.iter().any(|p| p.handle == reveal.handle) {
                debug!("Ignoring unrequested handle {}", reveal.handle);
                continue;
            }
            values.insert(reveal.handle, self.keypair.open(reveal)?);
        }

        info!(
            "🔓 Revealed {}/{} handles for {:?}",
            values.len(),
            pairs.len(),
            self.grant.signer
        );
        Ok(RevealedValues { values })
    }
}

/// Plaintexts keyed by handle; absent handles were not revealed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealedValues {
    values: HashMap<CiphertextHandle, U256>,
}

impl RevealedValues {
    pub fn get(&self, handle: &CiphertextHandle) -> Option<U256> {
        self.values.get(handle).copied()
    }

    /// Decimal string form, as the reveal wire format reports values
    pub fn decimal(&self, handle: &CiphertextHandle) -> Option<String> {
        self.get(handle).map(|v| v.to_string())
    }

    /// Value for `handle`, or `RevealUnavailable` naming `field`
    pub fn require(&self, handle: &CiphertextHandle, field: &str) -> Result<U256> {
        self.get(handle).ok_or_else(|| IdentityError::RevealUnavailable {
            field: field.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CiphertextHandle, &U256)> {
        self.values.iter()
    }
}
