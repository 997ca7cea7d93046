// Context - opens the shared store and wires every component onto it

use super::{CliConfig, ConfigError, PassphraseSource};
use crate::alias::{AliasError, AliasStore};
use crate::kms::{EncryptedManager, KeyStore, KmsError, MasterSecret, PlaintextManager};
use crate::resolver::{
    IdentityResolver, KeyResolver, LedgerQueryService, OperatorStore,
};
use crate::storage::{trees, CliStore, StoreError};
use crate::types::{ErrorKind, Network};
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Kms(#[from] KmsError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error("Cannot create state directory: {0}")]
    Io(String),
}

impl ContextError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextError::Config(e) => e.kind(),
            ContextError::Store(e) => e.kind(),
            ContextError::Kms(e) => e.kind(),
            ContextError::Alias(e) => e.kind(),
            ContextError::Io(_) => ErrorKind::Storage,
        }
    }
}

/// Everything a command needs, opened from one config
pub struct Context {
    pub config: CliConfig,
    pub store: CliStore,
    pub kms: KeyStore,
    pub aliases: AliasStore,
    pub operators: OperatorStore,
}

impl Context {
    /// Open the store under `config.home_dir`, creating it on first use
    pub fn open(config: CliConfig) -> Result<Self, ContextError> {
        config.validate()?;
        fs::create_dir_all(&config.home_dir).map_err(|e| ContextError::Io(e.to_string()))?;

        let store = CliStore::open_with_timeout(config.store_path(), config.lock_timeout)?;
        let secret = match &config.secret_source {
            PassphraseSource::SecretFile => MasterSecret::load_or_create(config.secret_path())?,
            PassphraseSource::Passphrase(passphrase) => {
                MasterSecret::from_passphrase_file(passphrase, config.salt_path())?
            }
        };

        Self::assemble(config, store, secret)
    }

    /// Build a context over an already-open store (temporary stores in tests)
    pub fn assemble(
        config: CliConfig,
        store: CliStore,
        secret: MasterSecret,
    ) -> Result<Self, ContextError> {
        let kms = KeyStore::open(&store)?
            .with_manager(Box::new(PlaintextManager::new(
                store.tree(trees::KEY_MATERIAL_PLAINTEXT)?,
            )))
            .with_manager(Box::new(EncryptedManager::new(
                store.tree(trees::KEY_MATERIAL_ENCRYPTED)?,
                secret,
            )));
        let aliases = AliasStore::open(&store)?;
        let operators = OperatorStore::open(&store)?;

        Ok(Self {
            config,
            store,
            kms,
            aliases,
            operators,
        })
    }

    /// Signer resolution on `network`
    pub fn key_resolver(&self, network: Network) -> KeyResolver<'_, AliasStore> {
        KeyResolver::new(&self.kms, &self.aliases, &self.operators, network)
    }

    /// Identity resolution against a ledger query service
    pub fn identity_resolver<Q: LedgerQueryService>(&self, ledger: Q) -> IdentityResolver<AliasStore, Q> {
        IdentityResolver::new(self.aliases.clone(), ledger)
    }

    /// Flush pending writes before the process exits
    pub fn close(self) -> Result<(), ContextError> {
        self.store.flush()?;
        Ok(())
    }
}
