// Context Tests
// A full installation opened from config, used, closed and reopened

use ledgerctl::alias::{AliasRecord, AliasService};
use ledgerctl::config::{CliConfig, ConfigError, Context, ContextError};
use ledgerctl::kms::{KeyAlgorithm, ENCRYPTED_MANAGER, PLAINTEXT_MANAGER};
use ledgerctl::resolver::{AccountInfo, MockLedgerQueryService, Operator, ReferenceKind};
use ledgerctl::types::{EntityId, EntityType, ErrorKind, Network};
use std::time::Duration;
use tempfile::TempDir;

const EC_PRIV: &str = "0000000000000000000000000000000000000000000000000000000000000001";

fn config(dir: &TempDir) -> CliConfig {
    CliConfig::new()
        .with_home_dir(dir.path().join("home"))
        .with_network(Network::Localnet)
        .with_lock_timeout(Duration::from_millis(200))
}

#[test]
fn test_open_creates_home_and_secret() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir);

    let ctx = Context::open(config.clone()).unwrap();

    assert!(config.store_path().exists());
    assert!(config.secret_path().exists());
    assert!(ctx.kms.has_manager(ENCRYPTED_MANAGER));
    assert!(ctx.kms.has_manager(PLAINTEXT_MANAGER));
    ctx.close().unwrap();
}

#[test]
fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let signer = {
        let ctx = Context::open(config(&temp_dir)).unwrap();
        let signer = ctx
            .key_resolver(Network::Localnet)
            .get_or_init_key(&format!("0.0.2:ecdsa:{EC_PRIV}"), ENCRYPTED_MANAGER, &[])
            .unwrap();
        ctx.operators
            .set_operator(
                Network::Localnet,
                &Operator {
                    account_id: signer.account_id,
                    key_ref_id: signer.key_ref_id.clone(),
                },
            )
            .unwrap();
        ctx.aliases
            .register(
                &AliasRecord::new("ops", EntityType::Account, Network::Localnet)
                    .with_entity_id(signer.account_id)
                    .with_key(signer.key_ref_id.clone(), signer.public_key.clone()),
            )
            .unwrap();
        ctx.close().unwrap();
        signer
    };

    let ctx = Context::open(config(&temp_dir)).unwrap();
    let resolver = ctx.key_resolver(Network::Localnet);

    let via_operator = resolver
        .get_or_init_key_with_fallback(None, ENCRYPTED_MANAGER, &[])
        .unwrap();
    let via_alias = resolver.get_or_init_key("ops", ENCRYPTED_MANAGER, &[]).unwrap();

    assert_eq!(via_operator, signer);
    assert_eq!(via_alias, signer);
    assert_eq!(ctx.kms.sign(&signer.key_ref_id, b"tx").unwrap().len(), 64);
}

#[test]
fn test_passphrase_context() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir).with_passphrase("hunter2");

    let created = {
        let ctx = Context::open(config.clone()).unwrap();
        let created = ctx
            .kms
            .create_local_private_key(KeyAlgorithm::Ed25519, ENCRYPTED_MANAGER, &[])
            .unwrap();
        ctx.close().unwrap();
        created
    };

    assert!(config.salt_path().exists());
    assert!(!config.secret_path().exists());

    let ctx = Context::open(config).unwrap();
    assert!(ctx.kms.sign(&created.key_ref_id, b"tx").is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let err = Context::open(config(&temp_dir).with_key_manager("hsm")).err().unwrap();
    assert!(matches!(err, ContextError::Config(ConfigError::Invalid(_))));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = Context::open(config(&temp_dir).with_passphrase("")).err().unwrap();
    assert!(matches!(err, ContextError::Config(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn test_identity_resolver_from_context() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = Context::open(config(&temp_dir)).unwrap();
    let created = ctx
        .kms
        .create_local_private_key(KeyAlgorithm::Ecdsa, ENCRYPTED_MANAGER, &[])
        .unwrap();
    ctx.aliases
        .register(
            &AliasRecord::new("alice", EntityType::Account, Network::Localnet)
                .with_entity_id(EntityId::new(0, 0, 1001)),
        )
        .unwrap();
    let ledger = MockLedgerQueryService::new().with_account(
        Network::Localnet,
        AccountInfo {
            account_id: EntityId::new(0, 0, 1001),
            account_public_key: Some(created.public_key.clone()),
            evm_address: None,
        },
    );

    let resolver = ctx.identity_resolver(ledger);
    let resolved = resolver
        .resolve_account("alice", ReferenceKind::Alias, Network::Localnet)
        .await
        .unwrap();

    assert_eq!(resolved.account_public_key, created.public_key);
    assert!(resolver
        .aliases()
        .resolve("alice", EntityType::Account, Network::Localnet)
        .unwrap()
        .is_some());
}
