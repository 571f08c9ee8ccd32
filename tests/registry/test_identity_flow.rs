// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// End-to-end submit / read / reveal against the in-memory registry

use encrypted_identity::crypto::key_derivation::KeyDerivationParams;
use encrypted_identity::grant::{AuthorizationGrantProtocol, WalletSigner};
use encrypted_identity::registry::{IdentityField, RegistryEvent, RevealedField};
use encrypted_identity::{
    IdentityError, IdentityRegistry, IdentityRegistryClient, InMemoryRegistry, MockFheBackend,
    SymmetricFieldCodec, TypedDataSigner,
};
use ethers::types::Address;
use std::sync::Arc;

struct Harness {
    backend: Arc<MockFheBackend>,
    registry: Arc<InMemoryRegistry>,
    client: IdentityRegistryClient,
}

fn harness() -> Harness {
    let backend = Arc::new(MockFheBackend::new());
    let registry = Arc::new(InMemoryRegistry::new(
        "0x9FB3DC39F2C0B4aE35fc916c18f5b729C113ea36".parse().unwrap(),
        backend.clone(),
    ));
    let client = IdentityRegistryClient::new(
        registry.clone(),
        backend.clone(),
        SymmetricFieldCodec::new(KeyDerivationParams::new("encrypted-identity:v1", 1_000).unwrap()),
        AuthorizationGrantProtocol::default(),
    );
    Harness {
        backend,
        registry,
        client,
    }
}

#[tokio::test]
async fn test_alice_scenario() {
    let h = harness();
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();

    let receipt = h.client.submit("Alice", 1990, 86, holder).await.unwrap();
    assert_eq!(receipt.event, RegistryEvent::Submitted { user: holder });

    assert!(h.registry.has_user(holder).await.unwrap());
    let stored = h.registry.get_user_info(holder).await.unwrap();

    let record = h.client.read(holder).await.unwrap();
    assert_eq!(record.name_envelope.encode(), stored.name_ciphertext);
    assert_eq!(record.handles, stored.handles);

    let identity = h.client.reveal(&record, &signer).await.unwrap();
    assert_eq!(identity.name, "Alice");
    assert_eq!(identity.birth_year, RevealedField::Revealed(1990));
    assert_eq!(identity.country_id, RevealedField::Revealed(86));
    assert_eq!(identity.owner_address, RevealedField::Revealed(holder));
    assert_eq!(identity.country_label().as_deref(), Some("Other"));
    assert!(identity.is_complete());

    assert_eq!(
        h.client.decrypt_name(&record, holder).unwrap(),
        "Alice"
    );
}

#[tokio::test]
async fn test_read_unknown_holder_is_not_found() {
    let h = harness();
    let result = h.client.read(Address::repeat_byte(0x77)).await;
    assert!(matches!(result, Err(IdentityError::NotFound { .. })));
}

#[tokio::test]
async fn test_other_address_cannot_reveal() {
    let h = harness();
    let owner = WalletSigner::random();
    let holder = owner.address().unwrap();
    h.client.submit("Alice", 1990, 86, holder).await.unwrap();
    let record = h.client.read(holder).await.unwrap();

    let stranger = WalletSigner::random();
    let result = h.client.reveal(&record, &stranger).await;
    assert!(matches!(result, Err(IdentityError::AccessDenied(_))));

    // Name is keyed to the owner's address, not the stranger's
    assert!(matches!(
        h.client
            .decrypt_name(&record, stranger.address().unwrap()),
        Err(IdentityError::Authentication(_))
    ));
}

#[tokio::test]
async fn test_out_of_range_birth_year_not_written() {
    let h = harness();
    let holder = Address::repeat_byte(0x55);

    let result = h.client.submit("Alice", 1i64 << 32, 86, holder).await;
    assert!(matches!(result, Err(IdentityError::Encoding(_))));
    let result = h.client.submit("Alice", -1, 86, holder).await;
    assert!(matches!(result, Err(IdentityError::Encoding(_))));

    assert!(!h.registry.has_user(holder).await.unwrap());
    assert!(h.client.all_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_encoder_not_ready() {
    let h = harness();
    h.backend.set_ready(false);
    let result = h
        .client
        .submit("Alice", 2025, 1, Address::repeat_byte(0x55))
        .await;
    assert!(matches!(result, Err(IdentityError::Encoding(_))));
}

#[tokio::test]
async fn test_missing_field_flagged_not_zeroed() {
    let h = harness();
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();
    h.client.submit("Alice", 1990, 86, holder).await.unwrap();

    let mut record = h.client.read(holder).await.unwrap();
    record.handles.country_id =
        encrypted_identity::CiphertextHandle::from_bytes([0xcd; 32]);

    let identity = h.client.reveal(&record, &signer).await.unwrap();
    assert_eq!(identity.birth_year, RevealedField::Revealed(1990));
    assert_eq!(identity.country_id, RevealedField::Unavailable);
    assert!(!identity.is_complete());
    assert!(matches!(
        identity.country_id.require(IdentityField::CountryId),
        Err(IdentityError::RevealUnavailable { field }) if field == "country_id"
    ));
}

#[tokio::test]
async fn test_name_decrypted_under_record_owner_for_delegate() {
    let h = harness();
    let owner = WalletSigner::random();
    let holder = owner.address().unwrap();
    h.client.submit("Alice", 1990, 86, holder).await.unwrap();
    let record = h.client.read(holder).await.unwrap();

    // The owner shares the numeric handles with a delegate on-chain
    let delegate = WalletSigner::random();
    for handle in record.handles.to_array() {
        h.backend.allow(&handle, delegate.address().unwrap());
    }

    let identity = h.client.reveal(&record, &delegate).await.unwrap();
    assert_eq!(identity.owner, holder);
    assert_eq!(identity.name, "Alice");
    assert_eq!(identity.birth_year, RevealedField::Revealed(1990));
    assert_eq!(identity.owner_address, RevealedField::Revealed(holder));
}
