// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for grant scoping and the validity window

use chrono::{Duration, TimeZone, Utc};
use encrypted_identity::fhe::{
    CiphertextHandle, FheBackend, FheType, HandleContractPair, MockFheBackend, TypedValue,
    UserDecryptRequest,
};
use encrypted_identity::grant::{AuthorizationGrantProtocol, GrantDomain, WalletSigner};
use encrypted_identity::{IdentityError, TypedDataSigner};
use ethers::types::{Address, U256};

async fn stored_value(
    backend: &MockFheBackend,
    contract: Address,
    holder: Address,
    value: u64,
) -> CiphertextHandle {
    let inputs = backend
        .encrypt_inputs(
            contract,
            holder,
            &[TypedValue {
                value: U256::from(value),
                fhe_type: FheType::Uint32,
            }],
        )
        .await
        .unwrap();
    let handle = inputs.handles[0];
    backend.allow(&handle, contract);
    backend.allow(&handle, holder);
    handle
}

#[tokio::test]
async fn test_grant_for_r1_unusable_on_r2() {
    let backend = MockFheBackend::new();
    let r1 = Address::repeat_byte(0xa1);
    let r2 = Address::repeat_byte(0xb2);
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();

    let on_r2 = stored_value(&backend, r2, holder, 1990).await;

    let mut session = AuthorizationGrantProtocol::default()
        .authorize(&signer, vec![r1])
        .await
        .unwrap();

    let result = session
        .reveal(
            &backend,
            &[HandleContractPair {
                handle: on_r2,
                contract_address: r2,
            }],
        )
        .await;
    assert!(matches!(result, Err(IdentityError::GrantScope { .. })));
}

#[tokio::test]
async fn test_backend_rejects_widened_scope() {
    // A caller that edits the scope after signing cannot get past the backend
    let backend = MockFheBackend::new();
    let r1 = Address::repeat_byte(0xa1);
    let r2 = Address::repeat_byte(0xb2);
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();
    let handle = stored_value(&backend, r2, holder, 86).await;

    let session = AuthorizationGrantProtocol::default()
        .authorize(&signer, vec![r1])
        .await
        .unwrap();
    let grant = session.grant();

    let forged = UserDecryptRequest {
        handle_contract_pairs: vec![HandleContractPair {
            handle,
            contract_address: r2,
        }],
        public_key: session.public_key_hex(),
        signature: grant.signature_hex(),
        contract_addresses: vec![r1, r2],
        user_address: holder,
        start_timestamp: grant.request.start_timestamp.to_string(),
        duration_days: grant.request.duration_days.to_string(),
    };
    assert!(matches!(
        backend.user_decrypt(&forged).await,
        Err(IdentityError::AccessDenied(_))
    ));
}

#[tokio::test]
async fn test_grant_for_other_domain_refused() {
    let backend = MockFheBackend::new();
    let registry = Address::repeat_byte(0xa1);
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();
    let handle = stored_value(&backend, registry, holder, 1990).await;

    let other_domain = GrantDomain {
        chain_id: 1,
        ..GrantDomain::default()
    };
    let mut session = AuthorizationGrantProtocol::new(other_domain, 10)
        .authorize(&signer, vec![registry])
        .await
        .unwrap();

    let result = session
        .reveal(
            &backend,
            &[HandleContractPair {
                handle,
                contract_address: registry,
            }],
        )
        .await;
    assert!(matches!(result, Err(IdentityError::AccessDenied(_))));
}

#[tokio::test]
async fn test_backend_enforces_window() {
    let backend = MockFheBackend::new();
    let registry = Address::repeat_byte(0xa1);
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();
    let handle = stored_value(&backend, registry, holder, 1990).await;

    let issued = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut session = AuthorizationGrantProtocol::default()
        .authorize_at(&signer, vec![registry], issued)
        .await
        .unwrap();
    let pairs = [HandleContractPair {
        handle,
        contract_address: registry,
    }];

    // Local clock says valid, backend clock says expired
    backend.set_now(Some(issued + Duration::days(10)));
    let result = session
        .reveal_at(&backend, &pairs, issued + Duration::days(1))
        .await;
    assert!(matches!(result, Err(IdentityError::GrantExpired { .. })));

    backend.set_now(Some(issued + Duration::days(10) - Duration::seconds(1)));
    let values = session
        .reveal_at(&backend, &pairs, issued + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(values.get(&handle), Some(U256::from(1990)));
}

#[tokio::test]
async fn test_backend_refuses_overflowing_start_timestamp() {
    let backend = MockFheBackend::new();
    let registry = Address::repeat_byte(0xa1);
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();
    let handle = stored_value(&backend, registry, holder, 1990).await;

    let session = AuthorizationGrantProtocol::default()
        .authorize(&signer, vec![registry])
        .await
        .unwrap();

    // Signed honestly, but over a window that does not fit in i64
    let mut request = session.grant().request.clone();
    request.start_timestamp = i64::MAX;
    let typed = request.typed_data(backend.domain()).unwrap();
    let signature = signer.sign_typed_data(&typed).await.unwrap();

    let wire = UserDecryptRequest {
        handle_contract_pairs: vec![HandleContractPair {
            handle,
            contract_address: registry,
        }],
        public_key: session.public_key_hex(),
        signature: hex::encode(signature.to_vec()),
        contract_addresses: vec![registry],
        user_address: holder,
        start_timestamp: i64::MAX.to_string(),
        duration_days: request.duration_days.to_string(),
    };
    assert!(matches!(
        backend.user_decrypt(&wire).await,
        Err(IdentityError::Format { ref what, .. }) if what == "startTimestamp"
    ));
}
