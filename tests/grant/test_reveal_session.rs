// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for reveal sessions against the mock backend

use encrypted_identity::fhe::{
    CiphertextHandle, FheBackend, FheType, HandleContractPair, MockFheBackend, TypedValue,
};
use encrypted_identity::grant::{AuthorizationGrantProtocol, SessionState, WalletSigner};
use encrypted_identity::{IdentityError, TypedDataSigner};
use ethers::types::{Address, U256};

struct Fixture {
    backend: MockFheBackend,
    registry: Address,
    signer: WalletSigner,
    handles: Vec<CiphertextHandle>,
}

async fn fixture() -> Fixture {
    let backend = MockFheBackend::new();
    let registry = Address::repeat_byte(0x42);
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();

    let inputs = backend
        .encrypt_inputs(
            registry,
            holder,
            &[
                TypedValue::address(holder),
                TypedValue {
                    value: U256::from(1990),
                    fhe_type: FheType::Uint32,
                },
                TypedValue {
                    value: U256::from(86),
                    fhe_type: FheType::Uint32,
                },
            ],
        )
        .await
        .unwrap();
    for handle in &inputs.handles {
        backend.allow(handle, registry);
        backend.allow(handle, holder);
    }

    Fixture {
        backend,
        registry,
        signer,
        handles: inputs.handles,
    }
}

fn pairs(handles: &[CiphertextHandle], registry: Address) -> Vec<HandleContractPair> {
    handles
        .iter()
        .map(|h| HandleContractPair {
            handle: *h,
            contract_address: registry,
        })
        .collect()
}

#[tokio::test]
async fn test_values_matched_by_handle_not_position() {
    let f = fixture().await;
    let mut session = AuthorizationGrantProtocol::default()
        .authorize(&f.signer, vec![f.registry])
        .await
        .unwrap();

    let mut reversed = f.handles.clone();
    reversed.reverse();
    let values = session
        .reveal(&f.backend, &pairs(&reversed, f.registry))
        .await
        .unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values.get(&f.handles[1]), Some(U256::from(1990)));
    assert_eq!(values.get(&f.handles[2]), Some(U256::from(86)));
    assert_eq!(
        values.get(&f.handles[0]),
        Some(U256::from_big_endian(f.signer.address().unwrap().as_bytes()))
    );
}

#[tokio::test]
async fn test_unknown_handle_is_absent_not_zero() {
    let f = fixture().await;
    let mut session = AuthorizationGrantProtocol::default()
        .authorize(&f.signer, vec![f.registry])
        .await
        .unwrap();

    let unknown = CiphertextHandle::from_bytes([0xee; 32]);
    let values = session
        .reveal(&f.backend, &pairs(&[f.handles[1], unknown], f.registry))
        .await
        .unwrap();

    assert_eq!(values.get(&unknown), None);
    assert!(matches!(
        values.require(&unknown, "country_id"),
        Err(IdentityError::RevealUnavailable { .. })
    ));
    assert_eq!(values.decimal(&f.handles[1]).as_deref(), Some("1990"));
}

#[tokio::test]
async fn test_non_owner_cannot_reveal() {
    let f = fixture().await;
    let stranger = WalletSigner::random();

    let mut session = AuthorizationGrantProtocol::default()
        .authorize(&stranger, vec![f.registry])
        .await
        .unwrap();
    let result = session
        .reveal(&f.backend, &pairs(&f.handles, f.registry))
        .await;

    assert!(matches!(result, Err(IdentityError::AccessDenied(_))));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_backend_outage_surfaces_without_retry() {
    let f = fixture().await;
    let mut session = AuthorizationGrantProtocol::default()
        .authorize(&f.signer, vec![f.registry])
        .await
        .unwrap();

    f.backend.set_online(false);
    let err = session
        .reveal(&f.backend, &pairs(&f.handles, f.registry))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::BackendUnavailable(_)));
    assert!(err.is_retryable());

    // The caller may retry with the same session inside its window
    f.backend.set_online(true);
    let values = session
        .reveal(&f.backend, &pairs(&f.handles, f.registry))
        .await
        .unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(session.state(), SessionState::Revealed);
}

#[tokio::test]
async fn test_sessions_use_distinct_keys() {
    let f = fixture().await;
    let protocol = AuthorizationGrantProtocol::default();
    let a = protocol.authorize(&f.signer, vec![f.registry]).await.unwrap();
    let b = protocol.authorize(&f.signer, vec![f.registry]).await.unwrap();
    assert_ne!(a.public_key_hex(), b.public_key_hex());
    assert_eq!(a.holder(), b.holder());
}
