// CliConfig - where the CLI keeps its state and which defaults it applies

use crate::kms::{ENCRYPTED_MANAGER, PLAINTEXT_MANAGER};
use crate::types::{ErrorKind, Network};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_HOME: &str = "LEDGERCTL_HOME";
pub const ENV_NETWORK: &str = "LEDGERCTL_NETWORK";
pub const ENV_KEY_MANAGER: &str = "LEDGERCTL_KEY_MANAGER";
pub const ENV_PASSPHRASE: &str = "LEDGERCTL_PASSPHRASE";

const DEFAULT_DIR_NAME: &str = ".ledgerctl";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot determine home directory; set {}", ENV_HOME)]
    NoHome,
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// How the encrypted key manager obtains its master secret
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassphraseSource {
    /// Random secret kept in `<home>/secret`
    SecretFile,
    /// Argon2id-derived from a passphrase, salt kept in `<home>/secret.salt`
    Passphrase(String),
}

/// Configuration for the CLI state directory and defaults
#[derive(Clone, Debug)]
pub struct CliConfig {
    /// Directory holding the store and the key store secret
    pub home_dir: PathBuf,
    /// Network used when a command does not name one
    pub network: Network,
    /// Storage manager for newly created or imported keys
    pub key_manager: String,
    /// Source of the encrypted manager's master secret
    pub secret_source: PassphraseSource,
    /// How long to wait for another CLI process to release the store
    pub lock_timeout: Duration,
}

impl CliConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from environment variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match env::var_os(ENV_HOME) {
            Some(home) => config.home_dir = PathBuf::from(home),
            None => {
                let user_home = env::var_os("HOME")
                    .or_else(|| env::var_os("USERPROFILE"))
                    .ok_or(ConfigError::NoHome)?;
                config.home_dir = PathBuf::from(user_home).join(DEFAULT_DIR_NAME);
            }
        }

        if let Ok(network) = env::var(ENV_NETWORK) {
            config.network = network
                .parse()
                .map_err(|e: crate::types::TypeParseError| ConfigError::Invalid(e.to_string()))?;
        }
        if let Ok(manager) = env::var(ENV_KEY_MANAGER) {
            config.key_manager = manager;
        }
        if let Ok(passphrase) = env::var(ENV_PASSPHRASE) {
            config.secret_source = PassphraseSource::Passphrase(passphrase);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the state directory
    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = home_dir.into();
        self
    }

    /// Set the default network
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Set the default key manager
    pub fn with_key_manager(mut self, manager: &str) -> Self {
        self.key_manager = manager.to_string();
        self
    }

    /// Derive the master secret from a passphrase
    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.secret_source = PassphraseSource::Passphrase(passphrase.to_string());
        self
    }

    /// Set the store lock timeout
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.home_dir.join("store")
    }

    pub fn secret_path(&self) -> PathBuf {
        self.home_dir.join("secret")
    }

    pub fn salt_path(&self) -> PathBuf {
        self.home_dir.join("secret.salt")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.home_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("home_dir must not be empty".to_string()));
        }
        if self.key_manager != ENCRYPTED_MANAGER && self.key_manager != PLAINTEXT_MANAGER {
            return Err(ConfigError::Invalid(format!(
                "key_manager must be '{}' or '{}', got '{}'",
                ENCRYPTED_MANAGER, PLAINTEXT_MANAGER, self.key_manager
            )));
        }
        if let PassphraseSource::Passphrase(passphrase) = &self.secret_source {
            if passphrase.is_empty() {
                return Err(ConfigError::Invalid("passphrase must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            home_dir: PathBuf::from(DEFAULT_DIR_NAME),
            network: Network::Testnet,
            key_manager: ENCRYPTED_MANAGER.to_string(),
            secret_source: PassphraseSource::SecretFile,
            lock_timeout: Duration::from_secs(10),
        }
    }
}
