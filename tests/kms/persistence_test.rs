// Key Persistence Tests
// Encrypted material across reopen, and what lands on disk

use ledgerctl::kms::{
    EncryptedManager, KeyAlgorithm, KeyStore, KmsError, MasterSecret, PlaintextManager,
    ENCRYPTED_MANAGER, PLAINTEXT_MANAGER,
};
use ledgerctl::storage::{trees, CliStore};
use std::path::Path;
use tempfile::TempDir;

const ED_PRIV: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

fn open_kms(dir: &Path, secret: MasterSecret) -> (CliStore, KeyStore) {
    let store = CliStore::open(dir.join("store")).unwrap();
    let kms = KeyStore::open(&store)
        .unwrap()
        .with_manager(Box::new(PlaintextManager::new(
            store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap(),
        )))
        .with_manager(Box::new(EncryptedManager::new(
            store.tree(trees::KEY_MATERIAL_ENCRYPTED).unwrap(),
            secret,
        )));
    (store, kms)
}

#[test]
fn test_encrypted_key_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let secret_path = temp_dir.path().join("secret");

    let (created, signature) = {
        let (_store, kms) = open_kms(temp_dir.path(), MasterSecret::load_or_create(&secret_path).unwrap());
        let created = kms
            .create_local_private_key(KeyAlgorithm::Ed25519, ENCRYPTED_MANAGER, &[])
            .unwrap();
        let signature = kms.sign(&created.key_ref_id, b"hello").unwrap();
        (created, signature)
    };

    let (_store, kms) = open_kms(temp_dir.path(), MasterSecret::load_or_create(&secret_path).unwrap());

    assert_eq!(
        kms.get_public_key(&created.key_ref_id).unwrap(),
        Some(created.public_key)
    );
    // ED25519 signatures are deterministic
    assert_eq!(kms.sign(&created.key_ref_id, b"hello").unwrap(), signature);
}

#[test]
fn test_encrypted_key_unreadable_with_other_secret() {
    let temp_dir = TempDir::new().unwrap();

    let created = {
        let (_store, kms) = open_kms(temp_dir.path(), MasterSecret::generate());
        kms.import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, ENCRYPTED_MANAGER, &[])
            .unwrap()
    };

    let (_store, kms) = open_kms(temp_dir.path(), MasterSecret::generate());

    assert!(kms.get(&created.key_ref_id).unwrap().is_some());
    assert!(matches!(
        kms.sign(&created.key_ref_id, b"hello"),
        Err(KmsError::Cipher(_))
    ));
}

#[test]
fn test_passphrase_secret_is_stable() {
    let temp_dir = TempDir::new().unwrap();
    let salt_path = temp_dir.path().join("salt");

    let created = {
        let secret = MasterSecret::from_passphrase_file("correct horse", &salt_path).unwrap();
        let (_store, kms) = open_kms(temp_dir.path(), secret);
        kms.import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, ENCRYPTED_MANAGER, &[])
            .unwrap()
    };

    let secret = MasterSecret::from_passphrase_file("correct horse", &salt_path).unwrap();
    let (_store, kms) = open_kms(temp_dir.path(), secret);

    assert_eq!(kms.sign(&created.key_ref_id, b"m").unwrap().len(), 64);
}

#[test]
fn test_material_on_disk_is_sealed() {
    let temp_dir = TempDir::new().unwrap();
    let (store, kms) = open_kms(temp_dir.path(), MasterSecret::generate());
    let scalar = hex::decode(ED_PRIV).unwrap();

    let sealed = kms
        .import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, ENCRYPTED_MANAGER, &[])
        .unwrap();
    let stored = store
        .tree(trees::KEY_MATERIAL_ENCRYPTED)
        .unwrap()
        .get(sealed.key_ref_id.as_str())
        .unwrap()
        .unwrap();

    assert!(!stored.windows(scalar.len()).any(|w| w == &scalar[..]));
    assert!(store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap().is_empty());
}

#[test]
fn test_plaintext_manager_is_opt_in() {
    let temp_dir = TempDir::new().unwrap();
    let (store, kms) = open_kms(temp_dir.path(), MasterSecret::generate());

    let created = kms
        .import_private_key(KeyAlgorithm::Ed25519, ED_PRIV, PLAINTEXT_MANAGER, &[])
        .unwrap();

    let handle = kms.get(&created.key_ref_id).unwrap().unwrap();
    assert_eq!(handle.manager_name, PLAINTEXT_MANAGER);
    assert_eq!(store.tree(trees::KEY_MATERIAL_PLAINTEXT).unwrap().len(), 1);
}
