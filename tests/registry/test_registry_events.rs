// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for registry lifecycle events, enumeration and proof binding

use encrypted_identity::crypto::key_derivation::KeyDerivationParams;
use encrypted_identity::fhe::{HomomorphicFieldEncoder, IdentityFields};
use encrypted_identity::grant::{AuthorizationGrantProtocol, WalletSigner};
use async_trait::async_trait;
use encrypted_identity::registry::{
    IdentitySubmission, RegistryEvent, RevealedField, StoredIdentity, SubmissionReceipt,
};
use encrypted_identity::{
    IdentityError, IdentityRegistry, IdentityRegistryClient, InMemoryRegistry, MockFheBackend,
    SymmetricFieldCodec, TypedDataSigner,
};
use ethers::types::{Address, H256, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn setup() -> (Arc<MockFheBackend>, Arc<InMemoryRegistry>, Arc<IdentityRegistryClient>) {
    let backend = Arc::new(MockFheBackend::new());
    let registry = Arc::new(InMemoryRegistry::new(Address::repeat_byte(0x99), backend.clone()));
    let client = IdentityRegistryClient::new(
        registry.clone(),
        backend.clone(),
        SymmetricFieldCodec::new(KeyDerivationParams::new("encrypted-identity:v1", 1_000).unwrap()),
        AuthorizationGrantProtocol::default(),
    );
    (backend, registry, Arc::new(client))
}

#[tokio::test]
async fn test_resubmission_overwrites_and_emits_updated() {
    let (_, _, client) = setup();
    let signer = WalletSigner::random();
    let holder = signer.address().unwrap();

    let first = client.submit("Alice", 1990, 86, holder).await.unwrap();
    let second = client.submit("Alicia", 1991, 3, holder).await.unwrap();
    assert_eq!(first.event, RegistryEvent::Submitted { user: holder });
    assert_eq!(second.event, RegistryEvent::Updated { user: holder });
    assert_ne!(first.transaction_hash, second.transaction_hash);

    let record = client.read(holder).await.unwrap();
    let identity = client.reveal(&record, &signer).await.unwrap();
    assert_eq!(identity.name, "Alicia");
    assert_eq!(identity.birth_year, RevealedField::Revealed(1991));
    assert_eq!(identity.country_label().as_deref(), Some("UK"));

    assert_eq!(client.all_users().await.unwrap(), vec![holder]);
}

#[tokio::test]
async fn test_all_users_in_first_submission_order() {
    let (_, _, client) = setup();
    let a = Address::repeat_byte(0x0a);
    let b = Address::repeat_byte(0x0b);

    client.submit("A", 1980, 1, a).await.unwrap();
    client.submit("B", 1985, 2, b).await.unwrap();
    client.submit("A2", 1981, 1, a).await.unwrap();

    assert_eq!(client.all_users().await.unwrap(), vec![a, b]);
    assert_eq!(client.protocol_id().await.unwrap(), U256::from(10001));
}

#[tokio::test]
async fn test_concurrent_submissions_for_one_holder() {
    let (_, registry, client) = setup();
    let holder = Address::repeat_byte(0x0c);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .submit(&format!("name-{}", i), 1990 + i, 86, holder)
                    .await
            })
        })
        .collect();

    let mut submitted = 0;
    let mut updated = 0;
    for task in tasks {
        match task.await.unwrap().unwrap().event {
            RegistryEvent::Submitted { .. } => submitted += 1,
            RegistryEvent::Updated { .. } => updated += 1,
        }
    }
    assert_eq!(submitted, 1);
    assert_eq!(updated, 7);
    assert_eq!(registry.get_all_users().await.unwrap(), vec![holder]);
}

#[tokio::test]
async fn test_proof_bound_to_submitter_and_registry() {
    let (backend, registry, _) = setup();
    let encoder = HomomorphicFieldEncoder::new(backend.clone());
    let alice = Address::repeat_byte(0x01);
    let mallory = Address::repeat_byte(0x02);

    let encoded = encoder
        .encode(
            registry.address(),
            alice,
            &IdentityFields {
                owner_address: alice,
                birth_year: 1990,
                country_id: 86,
            },
        )
        .await
        .unwrap();

    // Replayed by another sender
    let result = registry
        .submit_user(
            mallory,
            IdentitySubmission {
                name_ciphertext: String::new(),
                handles: encoded.handles,
                input_proof: encoded.input_proof.clone(),
            },
        )
        .await;
    assert!(matches!(result, Err(IdentityError::AccessDenied(_))));

    // Reordered handles
    let mut swapped = encoded.handles;
    std::mem::swap(&mut swapped.birth_year, &mut swapped.country_id);
    let result = registry
        .submit_user(
            alice,
            IdentitySubmission {
                name_ciphertext: String::new(),
                handles: swapped,
                input_proof: encoded.input_proof.clone(),
            },
        )
        .await;
    assert!(matches!(result, Err(IdentityError::AccessDenied(_))));

    // Encoded for a different registry
    let other = InMemoryRegistry::new(Address::repeat_byte(0x98), backend.clone());
    let result = other
        .submit_user(
            alice,
            IdentitySubmission {
                name_ciphertext: String::new(),
                handles: encoded.handles,
                input_proof: encoded.input_proof,
            },
        )
        .await;
    assert!(matches!(result, Err(IdentityError::AccessDenied(_))));
    assert!(!registry.has_user(mallory).await.unwrap());
}

#[test]
fn test_unset_user_reads_as_empty() {
    let (_, registry, _) = setup();
    let stored = tokio_test::block_on(registry.get_user_info(Address::repeat_byte(0x33))).unwrap();
    assert!(stored.name_ciphertext.is_empty());
    assert_eq!(stored.handles.birth_year.to_bytes(), [0u8; 32]);
}

/// Registry that records how many writes overlap, per holder and overall
#[derive(Default)]
struct OverlapRecorder {
    in_flight: Mutex<HashMap<Address, usize>>,
    max_per_holder: AtomicUsize,
    total: AtomicUsize,
    max_total: AtomicUsize,
}

#[async_trait]
impl IdentityRegistry for OverlapRecorder {
    fn address(&self) -> Address {
        Address::repeat_byte(0x99)
    }

    async fn submit_user(
        &self,
        submitter: Address,
        _submission: IdentitySubmission,
    ) -> encrypted_identity::Result<SubmissionReceipt> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(submitter).or_default();
            *count += 1;
            self.max_per_holder.fetch_max(*count, Ordering::SeqCst);
        }
        let total = self.total.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_total.fetch_max(total, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.total.fetch_sub(1, Ordering::SeqCst);
        *self.in_flight.lock().unwrap().entry(submitter).or_default() -= 1;
        Ok(SubmissionReceipt {
            transaction_hash: H256::zero(),
            block_number: None,
            event: RegistryEvent::Submitted { user: submitter },
        })
    }

    async fn has_user(&self, _user: Address) -> encrypted_identity::Result<bool> {
        Ok(false)
    }

    async fn get_user_info(&self, user: Address) -> encrypted_identity::Result<StoredIdentity> {
        Err(IdentityError::NotFound {
            owner: format!("{:?}", user),
        })
    }

    async fn get_all_users(&self) -> encrypted_identity::Result<Vec<Address>> {
        Ok(Vec::new())
    }

    async fn protocol_id(&self) -> encrypted_identity::Result<U256> {
        Ok(U256::zero())
    }
}

#[tokio::test]
async fn test_submissions_serialised_per_holder_only() {
    let backend = Arc::new(MockFheBackend::new());
    let recorder = Arc::new(OverlapRecorder::default());
    let client = Arc::new(IdentityRegistryClient::new(
        recorder.clone(),
        backend,
        SymmetricFieldCodec::new(KeyDerivationParams::new("encrypted-identity:v1", 1_000).unwrap()),
        AuthorizationGrantProtocol::default(),
    ));
    let a = Address::repeat_byte(0x0a);
    let b = Address::repeat_byte(0x0b);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            let holder = if i % 2 == 0 { a } else { b };
            tokio::spawn(async move { client.submit("name", 1990, 86, holder).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(recorder.max_per_holder.load(Ordering::SeqCst), 1);
    assert!(recorder.max_total.load(Ordering::SeqCst) >= 2);
}
