// Key Store Tests
// Creation, import, validation, EVM derivation, signing and removal

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use ledgerctl::kms::{
    EncryptedManager, KeyAlgorithm, KeyRefId, KeyStore, KmsError, MasterSecret, PlaintextManager,
    ENCRYPTED_MANAGER, PLAINTEXT_MANAGER,
};
use ledgerctl::storage::{trees, CliStore};
use ledgerctl::types::ErrorKind;
use sha3::{Digest, Keccak256};

// RFC 8032 test vectors
const ED_PRIV: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
const ED_PUB: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
const ED_OTHER_PUB: &str = "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c";

// secp256k1 scalars 1 and 2
const EC_PRIV: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const EC_PUB: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
const EC_EVM: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";
const EC_OTHER_PUB: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

const ED_DER_PREFIX: &str = "302e020100300506032b657004220420";
const EC_DER_PREFIX: &str = "3030020100300706052b8104000a04220420";

fn test_kms() -> (CliStore, KeyStore) {
    let store = CliStore::temporary().unwrap();
    let kms = KeyStore::open(&store)
        .unwrap()
        .with_manager(Box::new(PlaintextManager::new(
            store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap(),
        )))
        .with_manager(Box::new(EncryptedManager::new(
            store.tree(trees::KEY_MATERIAL_ENCRYPTED).unwrap(),
            MasterSecret::generate(),
        )));
    (store, kms)
}

fn key_forms(raw: &str, der_prefix: &str) -> Vec<String> {
    vec![
        raw.to_string(),
        format!("0x{raw}"),
        format!("{der_prefix}{raw}"),
    ]
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ============================================================================
// CREATE
// ============================================================================

#[test]
fn test_create_local_keys() {
    let (_store, kms) = test_kms();

    for algorithm in [KeyAlgorithm::Ed25519, KeyAlgorithm::Ecdsa] {
        let created = kms
            .create_local_private_key(algorithm, ENCRYPTED_MANAGER, &tags(&["account:create"]))
            .unwrap();

        assert!(created.key_ref_id.as_str().starts_with("kr_"));
        assert_eq!(created.public_key.algorithm(), algorithm);

        let handle = kms.get(&created.key_ref_id).unwrap().unwrap();
        assert_eq!(handle.algorithm, algorithm);
        assert_eq!(handle.manager_name, ENCRYPTED_MANAGER);
        assert_eq!(handle.tags, tags(&["account:create"]));
        assert_eq!(
            kms.get_public_key(&created.key_ref_id).unwrap(),
            Some(created.public_key)
        );
    }

    assert_eq!(kms.list().unwrap().len(), 2);
}

#[test]
fn test_create_with_unknown_manager() {
    let (_store, kms) = test_kms();

    let result = kms.create_local_private_key(KeyAlgorithm::Ed25519, "hsm", &[]);

    assert!(matches!(result, Err(KmsError::UnknownManager(_))));
    assert!(kms.list().unwrap().is_empty());
}

#[test]
fn test_get_public_key_unknown_ref() {
    let (_store, kms) = test_kms();

    assert_eq!(kms.get_public_key(&KeyRefId::new("kr_missing")).unwrap(), None);
}

// ============================================================================
// IMPORT
// ============================================================================

#[test]
fn test_import_accepts_raw_prefixed_and_der() {
    let (_store, kms) = test_kms();

    for text in key_forms(ED_PRIV, ED_DER_PREFIX) {
        let created = kms
            .import_private_key(KeyAlgorithm::Ed25519, &text, PLAINTEXT_MANAGER, &[])
            .unwrap();
        assert_eq!(created.public_key.to_hex(), ED_PUB);
    }
    for text in key_forms(EC_PRIV, EC_DER_PREFIX) {
        let created = kms
            .import_private_key(KeyAlgorithm::Ecdsa, &text, PLAINTEXT_MANAGER, &[])
            .unwrap();
        assert_eq!(created.public_key.to_hex(), EC_PUB);
    }

    // Same key in any encoding maps to one handle
    assert_eq!(kms.list().unwrap().len(), 2);
}

#[test]
fn test_import_is_idempotent_and_merges_tags() {
    let (_store, kms) = test_kms();

    let first = kms
        .import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, ENCRYPTED_MANAGER, &tags(&["a"]))
        .unwrap();
    let second = kms
        .import_private_key(
            KeyAlgorithm::Ed25519,
            &format!("0x{ED_PRIV}"),
            ENCRYPTED_MANAGER,
            &tags(&["a", "b"]),
        )
        .unwrap();

    assert_eq!(first.key_ref_id, second.key_ref_id);
    let handle = kms.get(&first.key_ref_id).unwrap().unwrap();
    assert_eq!(handle.tags, tags(&["a", "b"]));
}

#[test]
fn test_reimport_moves_material_to_requested_manager() {
    let (store, kms) = test_kms();
    let plaintext = store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap();
    let encrypted = store.tree(trees::KEY_MATERIAL_ENCRYPTED).unwrap();

    let first = kms
        .import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, PLAINTEXT_MANAGER, &tags(&["a"]))
        .unwrap();
    assert_eq!(plaintext.len(), 1);

    let second = kms
        .import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, ENCRYPTED_MANAGER, &tags(&["b"]))
        .unwrap();

    assert_eq!(second.key_ref_id, first.key_ref_id);
    let handle = kms.get(&first.key_ref_id).unwrap().unwrap();
    assert_eq!(handle.manager_name, ENCRYPTED_MANAGER);
    assert_eq!(handle.tags, tags(&["a", "b"]));
    assert!(plaintext.is_empty());
    assert_eq!(encrypted.len(), 1);
    assert_eq!(kms.sign(&first.key_ref_id, b"still usable").unwrap().len(), 64);
}

#[test]
fn test_validated_reimport_moves_material_to_requested_manager() {
    let (store, kms) = test_kms();

    kms.import_private_key(KeyAlgorithm::Ecdsa, EC_PRIV, PLAINTEXT_MANAGER, &[])
        .unwrap();
    let key_ref_id = kms
        .import_and_validate_private_key(KeyAlgorithm::Ecdsa, EC_PRIV, EC_PUB, ENCRYPTED_MANAGER, &[])
        .unwrap();

    assert_eq!(kms.get(&key_ref_id).unwrap().unwrap().manager_name, ENCRYPTED_MANAGER);
    assert!(store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap().is_empty());
}

#[test]
fn test_import_rejects_malformed_text() {
    let (_store, kms) = test_kms();

    for text in ["", "not-hex", "0x1234", &ED_PRIV[..62], format!("{ED_PRIV}00").as_str()] {
        let err = kms
            .import_private_key(KeyAlgorithm::Ed25519, text, PLAINTEXT_MANAGER, &[])
            .unwrap_err();
        assert!(matches!(err, KmsError::InvalidKey(_)), "{text}: {err:?}");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(kms.list().unwrap().is_empty());
}

#[test]
fn test_import_rejects_der_of_other_algorithm() {
    let (_store, kms) = test_kms();

    let err = kms
        .import_private_key(
            KeyAlgorithm::Ed25519,
            &format!("{EC_DER_PREFIX}{EC_PRIV}"),
            PLAINTEXT_MANAGER,
            &[],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        KmsError::AlgorithmMismatch {
            expected: KeyAlgorithm::Ed25519,
            found: KeyAlgorithm::Ecdsa
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_import_rejects_zero_ecdsa_scalar() {
    let (_store, kms) = test_kms();

    let result = kms.import_private_key(KeyAlgorithm::Ecdsa, &"00".repeat(32), PLAINTEXT_MANAGER, &[]);

    assert!(matches!(result, Err(KmsError::InvalidKey(_))));
}

// ============================================================================
// IMPORT AND VALIDATE
// ============================================================================

#[test]
fn test_import_and_validate_accepts_matching_keys() {
    let (_store, kms) = test_kms();

    for text in key_forms(ED_PRIV, ED_DER_PREFIX) {
        let key_ref_id = kms
            .import_and_validate_private_key(KeyAlgorithm::Ed25519, &text, ED_PUB, ENCRYPTED_MANAGER, &[])
            .unwrap();
        assert_eq!(kms.get_public_key(&key_ref_id).unwrap().unwrap().to_hex(), ED_PUB);
    }
    for text in key_forms(EC_PRIV, EC_DER_PREFIX) {
        let key_ref_id = kms
            .import_and_validate_private_key(KeyAlgorithm::Ecdsa, &text, EC_PUB, ENCRYPTED_MANAGER, &[])
            .unwrap();
        assert_eq!(kms.get_public_key(&key_ref_id).unwrap().unwrap().to_hex(), EC_PUB);
    }
}

#[test]
fn test_import_and_validate_accepts_der_expected_key() {
    let (_store, kms) = test_kms();
    let expected_der = format!("302a300506032b6570032100{ED_PUB}");

    let key_ref_id = kms
        .import_and_validate_private_key(
            KeyAlgorithm::Ed25519,
            ED_PRIV,
            &expected_der,
            PLAINTEXT_MANAGER,
            &[],
        )
        .unwrap();

    let public_key = kms.get_public_key(&key_ref_id).unwrap().unwrap();
    assert_eq!(public_key.to_der_hex(), expected_der);
}

#[test]
fn test_import_and_validate_rejects_mismatch_without_writing() {
    let (_store, kms) = test_kms();

    for text in key_forms(ED_PRIV, ED_DER_PREFIX) {
        let err = kms
            .import_and_validate_private_key(
                KeyAlgorithm::Ed25519,
                &text,
                ED_OTHER_PUB,
                ENCRYPTED_MANAGER,
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, KmsError::PublicKeyMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    for text in key_forms(EC_PRIV, EC_DER_PREFIX) {
        let err = kms
            .import_and_validate_private_key(
                KeyAlgorithm::Ecdsa,
                &text,
                EC_OTHER_PUB,
                ENCRYPTED_MANAGER,
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, KmsError::PublicKeyMismatch { .. }));
    }

    assert!(kms.list().unwrap().is_empty());
}

// ============================================================================
// EVM ADDRESS
// ============================================================================

#[test]
fn test_evm_address_known_vector() {
    let (_store, kms) = test_kms();
    let created = kms
        .import_private_key(KeyAlgorithm::Ecdsa, EC_PRIV, PLAINTEXT_MANAGER, &[])
        .unwrap();

    let address = kms.evm_address(&created.key_ref_id).unwrap();

    assert_eq!(address.to_string(), EC_EVM);
    assert_eq!(created.public_key.evm_address().unwrap(), address);
}

#[test]
fn test_evm_address_is_deterministic() {
    let (_store, kms) = test_kms();
    let created = kms
        .create_local_private_key(KeyAlgorithm::Ecdsa, ENCRYPTED_MANAGER, &[])
        .unwrap();

    let first = kms.evm_address(&created.key_ref_id).unwrap();
    let second = kms.evm_address(&created.key_ref_id).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_evm_address_rejected_for_ed25519() {
    let (_store, kms) = test_kms();
    let created = kms
        .create_local_private_key(KeyAlgorithm::Ed25519, ENCRYPTED_MANAGER, &[])
        .unwrap();

    let err = kms.evm_address(&created.key_ref_id).unwrap_err();

    assert!(matches!(err, KmsError::EvmUnsupported(KeyAlgorithm::Ed25519)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ============================================================================
// SIGN / REMOVE
// ============================================================================

#[test]
fn test_sign_ed25519_verifies() {
    let (_store, kms) = test_kms();
    let created = kms
        .import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, ENCRYPTED_MANAGER, &[])
        .unwrap();

    let signature = kms.sign(&created.key_ref_id, b"transfer 10").unwrap();

    let public: [u8; 32] = created.public_key.as_bytes().try_into().unwrap();
    let verifying_key = VerifyingKey::from_bytes(&public).unwrap();
    let signature = Signature::from_slice(&signature).unwrap();
    assert!(verifying_key.verify(b"transfer 10", &signature).is_ok());
}

#[test]
fn test_sign_ecdsa_over_keccak_verifies() {
    let (_store, kms) = test_kms();
    let created = kms
        .create_local_private_key(KeyAlgorithm::Ecdsa, PLAINTEXT_MANAGER, &[])
        .unwrap();

    let signature = kms.sign(&created.key_ref_id, b"transfer 10").unwrap();

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Keccak256::digest(b"transfer 10"));
    let secp = secp256k1::Secp256k1::verification_only();
    let public = secp256k1::PublicKey::from_slice(created.public_key.as_bytes()).unwrap();
    let signature = secp256k1::ecdsa::Signature::from_compact(&signature).unwrap();
    let message = secp256k1::Message::from_digest(digest);
    assert!(secp.verify_ecdsa(&message, &signature, &public).is_ok());
}

#[test]
fn test_remove_key() {
    let (store, kms) = test_kms();
    let created = kms
        .create_local_private_key(KeyAlgorithm::Ed25519, ENCRYPTED_MANAGER, &[])
        .unwrap();

    assert!(kms.remove(&created.key_ref_id).unwrap());

    assert_eq!(kms.get_public_key(&created.key_ref_id).unwrap(), None);
    assert!(store.tree(trees::KEY_MATERIAL_ENCRYPTED).unwrap().is_empty());
    assert!(!kms.remove(&created.key_ref_id).unwrap());
    assert!(matches!(
        kms.sign(&created.key_ref_id, b"msg"),
        Err(KmsError::KeyNotFound(_))
    ));
}

#[test]
fn test_find_by_public_key() {
    let (_store, kms) = test_kms();
    let created = kms
        .import_private_key(KeyAlgorithm::Ecdsa, EC_PRIV, PLAINTEXT_MANAGER, &[])
        .unwrap();

    let found = kms.find_by_public_key(&created.public_key).unwrap().unwrap();

    assert_eq!(found.key_ref_id, created.key_ref_id);
}

#[test]
fn test_remove_with_unregistered_manager_keeps_record() {
    let (store, kms) = test_kms();
    let created = kms
        .create_local_private_key(KeyAlgorithm::Ed25519, ENCRYPTED_MANAGER, &[])
        .unwrap();
    let plaintext_only = KeyStore::open(&store).unwrap().with_manager(Box::new(
        PlaintextManager::new(store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap()),
    ));

    let err = plaintext_only.remove(&created.key_ref_id).unwrap_err();

    assert!(matches!(err, KmsError::UnknownManager(_)));
    assert!(kms.get(&created.key_ref_id).unwrap().is_some());
    assert_eq!(store.tree(trees::KEY_MATERIAL_ENCRYPTED).unwrap().len(), 1);
}
