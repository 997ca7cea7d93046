use super::{QueryError, ReferenceKind};
use crate::alias::AliasError;
use crate::kms::KmsError;
use crate::storage::StoreError;
use crate::types::{EntityId, ErrorKind, Network};
use thiserror::Error;

/// Errors from identity resolution
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid {kind} reference '{reference}': {reason}")]
    InvalidReference {
        reference: String,
        kind: ReferenceKind,
        reason: String,
    },

    #[error("Unknown reference kind '{0}': expected alias, entity-id or evm-address")]
    UnknownReferenceKind(String),

    #[error("Alias '{alias}' on {network} has no entity id")]
    MissingEntityId { alias: String, network: Network },

    #[error("'{reference}' not found on {network}")]
    NotFound { reference: String, network: Network },

    #[error("Ledger reports no single public key for account {0}")]
    MissingPublicKey(EntityId),

    #[error("Alias '{alias}' points to {expected} but the ledger returned {found}")]
    Inconsistent {
        alias: String,
        expected: EntityId,
        found: EntityId,
    },

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::InvalidReference { .. } | ResolveError::UnknownReferenceKind(_) => {
                ErrorKind::Validation
            }
            ResolveError::NotFound { .. } => ErrorKind::NotFound,
            ResolveError::MissingEntityId { .. }
            | ResolveError::MissingPublicKey(_)
            | ResolveError::Inconsistent { .. } => ErrorKind::State,
            ResolveError::Alias(e) => e.kind(),
            ResolveError::Query(_) => ErrorKind::External,
        }
    }
}

/// Errors from signer resolution
#[derive(Error, Debug)]
pub enum KeyResolverError {
    #[error("Invalid signer reference: {0}")]
    InvalidReference(String),

    #[error("Alias '{alias}' on {network} has no signing key")]
    NoKeyHandle { alias: String, network: Network },

    #[error("Alias '{alias}' on {network} has no entity id")]
    MissingEntityId { alias: String, network: Network },

    #[error("Key {0} referenced by an alias or operator is not in the key store")]
    DanglingKeyRef(String),

    #[error("No operator configured for {0}")]
    NoOperator(Network),

    #[error(transparent)]
    Kms(#[from] KmsError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl KeyResolverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyResolverError::InvalidReference(_) => ErrorKind::Validation,
            KeyResolverError::NoOperator(_) => ErrorKind::NotFound,
            KeyResolverError::NoKeyHandle { .. }
            | KeyResolverError::MissingEntityId { .. }
            | KeyResolverError::DanglingKeyRef(_) => ErrorKind::State,
            KeyResolverError::Kms(e) => e.kind(),
            KeyResolverError::Alias(e) => e.kind(),
            KeyResolverError::Store(e) => e.kind(),
        }
    }
}
