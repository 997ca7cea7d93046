use super::KeyAlgorithm;
use crate::storage::StoreError;
use crate::types::ErrorKind;
use thiserror::Error;

/// Errors from key store operations
///
/// None of the variants ever carries private key material.
#[derive(Error, Debug)]
pub enum KmsError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unsupported key algorithm '{0}': expected ed25519 or ecdsa")]
    UnsupportedAlgorithm(String),

    #[error("Cannot infer key algorithm from raw key; prefix it with ed25519: or ecdsa: or use DER")]
    AmbiguousAlgorithm,

    #[error("Key algorithm mismatch: expected {expected}, key is {found}")]
    AlgorithmMismatch {
        expected: KeyAlgorithm,
        found: KeyAlgorithm,
    },

    #[error("Private key does not match expected public key {expected} (derived {derived})")]
    PublicKeyMismatch { expected: String, derived: String },

    #[error("EVM address derivation requires an ECDSA key, got {0}")]
    EvmUnsupported(KeyAlgorithm),

    #[error("Unknown key manager '{0}'")]
    UnknownManager(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key material missing for {0}")]
    MissingMaterial(String),

    #[error("Key material could not be decrypted: {0}")]
    Cipher(String),

    #[error("Secret file error: {0}")]
    Io(String),

    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl KmsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KmsError::InvalidKey(_)
            | KmsError::UnsupportedAlgorithm(_)
            | KmsError::AmbiguousAlgorithm
            | KmsError::AlgorithmMismatch { .. }
            | KmsError::PublicKeyMismatch { .. }
            | KmsError::EvmUnsupported(_)
            | KmsError::UnknownManager(_) => ErrorKind::Validation,
            KmsError::KeyNotFound(_) => ErrorKind::NotFound,
            KmsError::MissingMaterial(_) | KmsError::Cipher(_) => ErrorKind::State,
            KmsError::Io(_)
            | KmsError::Database(_)
            | KmsError::Serialization(_)
            | KmsError::Store(_) => ErrorKind::Storage,
        }
    }
}

impl From<sled::Error> for KmsError {
    fn from(err: sled::Error) -> Self {
        KmsError::Database(err.to_string())
    }
}
