use crate::storage::StoreError;
use crate::types::{EntityType, ErrorKind, Network};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AliasError {
    #[error("Invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },

    #[error("Alias '{alias}' already exists for {entity_type} on {network}")]
    AlreadyExists {
        alias: String,
        entity_type: EntityType,
        network: Network,
    },

    #[error("Alias '{alias}' is already taken on {network} (used by {used_by})")]
    Taken {
        alias: String,
        network: Network,
        used_by: String,
    },

    #[error("Alias '{alias}' not found for {entity_type} on {network}")]
    NotFound {
        alias: String,
        entity_type: EntityType,
        network: Network,
    },

    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("Corrupt alias record: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AliasError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AliasError::InvalidAlias { .. }
            | AliasError::AlreadyExists { .. }
            | AliasError::Taken { .. } => ErrorKind::Validation,
            AliasError::NotFound { .. } => ErrorKind::NotFound,
            AliasError::Database(_) | AliasError::Serialization(_) | AliasError::Store(_) => {
                ErrorKind::Storage
            }
        }
    }
}

impl From<sled::Error> for AliasError {
    fn from(err: sled::Error) -> Self {
        AliasError::Database(err.to_string())
    }
}
