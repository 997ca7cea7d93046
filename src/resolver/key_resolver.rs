// KeyResolver - turns a loosely-typed signer argument into a signing identity
//
// Accepted forms:
// - "<entityId>:<privateKey>"             algorithm taken from DER structure
// - "<entityId>:<algorithm>:<privateKey>" algorithm given explicitly
// - "<alias>"                             an account alias owning a key handle
//
// Raw key text never leaves this module except into the key store.

use super::operator::OperatorStore;
use super::KeyResolverError;
use crate::alias::{validate_alias, AliasService};
use crate::kms::{detect_algorithm, KeyAlgorithm, KeyRefId, KeyStore, PublicKey};
use crate::types::{EntityId, EntityType, Network};
use std::fmt;
use tracing::debug;

/// Identity ready to sign: account, public key and key handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSigner {
    pub account_id: EntityId,
    pub public_key: PublicKey,
    pub key_ref_id: KeyRefId,
}

enum SignerReference<'a> {
    Inline {
        account_id: EntityId,
        algorithm: Option<KeyAlgorithm>,
        key_text: &'a str,
    },
    Alias(&'a str),
}

impl fmt::Debug for SignerReference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerReference::Inline {
                account_id,
                algorithm,
                ..
            } => f
                .debug_struct("Inline")
                .field("account_id", account_id)
                .field("algorithm", algorithm)
                .field("key_text", &"[REDACTED]")
                .finish(),
            SignerReference::Alias(alias) => f.debug_tuple("Alias").field(alias).finish(),
        }
    }
}

fn parse_signer_reference(reference: &str) -> Result<SignerReference<'_>, KeyResolverError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(KeyResolverError::InvalidReference("reference is empty".into()));
    }

    if !reference.contains(':') {
        validate_alias(reference).map_err(|e| KeyResolverError::InvalidReference(e.to_string()))?;
        return Ok(SignerReference::Alias(reference));
    }

    let parts: Vec<&str> = reference.split(':').collect();
    let (id_text, algorithm, key_text) = match parts.as_slice() {
        [id, key] => (*id, None, *key),
        [id, algorithm, key] => (*id, Some(algorithm.parse::<KeyAlgorithm>()?), *key),
        _ => {
            return Err(KeyResolverError::InvalidReference(
                "expected <entityId>:<privateKey> or <entityId>:<algorithm>:<privateKey>".into(),
            ))
        }
    };

    let account_id = id_text.parse::<EntityId>().map_err(|_| {
        KeyResolverError::InvalidReference(format!("'{}' is not an entity id", id_text))
    })?;
    if key_text.is_empty() {
        return Err(KeyResolverError::InvalidReference("private key is empty".into()));
    }

    Ok(SignerReference::Inline {
        account_id,
        algorithm,
        key_text,
    })
}

/// Resolves signer arguments for one network
pub struct KeyResolver<'a, A: AliasService> {
    kms: &'a KeyStore,
    aliases: &'a A,
    operators: &'a OperatorStore,
    network: Network,
}

impl<'a, A: AliasService> KeyResolver<'a, A> {
    pub fn new(
        kms: &'a KeyStore,
        aliases: &'a A,
        operators: &'a OperatorStore,
        network: Network,
    ) -> Self {
        Self {
            kms,
            aliases,
            operators,
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Resolve an inline `entityId:privateKey` pair or an account alias
    ///
    /// Inline keys are imported through `manager_name` and tagged with
    /// `tags`; the alias store is not consulted for them.
    pub fn get_or_init_key(
        &self,
        reference: &str,
        manager_name: &str,
        tags: &[String],
    ) -> Result<ResolvedSigner, KeyResolverError> {
        match parse_signer_reference(reference)? {
            SignerReference::Inline {
                account_id,
                algorithm,
                key_text,
            } => {
                let algorithm = match algorithm {
                    Some(algorithm) => algorithm,
                    None => detect_algorithm(key_text)?,
                };
                let created = self
                    .kms
                    .import_private_key(algorithm, key_text, manager_name, tags)?;

                debug!(account_id = %account_id, key_ref_id = %created.key_ref_id, "imported inline signer");
                Ok(ResolvedSigner {
                    account_id,
                    public_key: created.public_key,
                    key_ref_id: created.key_ref_id,
                })
            }
            SignerReference::Alias(alias) => self.resolve_alias(alias),
        }
    }

    /// As [`KeyResolver::get_or_init_key`], but an absent reference resolves
    /// to the network's operator
    pub fn get_or_init_key_with_fallback(
        &self,
        reference: Option<&str>,
        manager_name: &str,
        tags: &[String],
    ) -> Result<ResolvedSigner, KeyResolverError> {
        match reference {
            Some(reference) => self.get_or_init_key(reference, manager_name, tags),
            None => self.resolve_operator(),
        }
    }

    fn resolve_alias(&self, alias: &str) -> Result<ResolvedSigner, KeyResolverError> {
        let record = self
            .aliases
            .resolve_or_throw(alias, EntityType::Account, self.network)?;

        let account_id = record.entity_id.ok_or_else(|| KeyResolverError::MissingEntityId {
            alias: alias.to_string(),
            network: self.network,
        })?;
        let key_ref_id = record.key_ref_id.ok_or_else(|| KeyResolverError::NoKeyHandle {
            alias: alias.to_string(),
            network: self.network,
        })?;
        let public_key = self
            .kms
            .get_public_key(&key_ref_id)?
            .ok_or_else(|| KeyResolverError::DanglingKeyRef(key_ref_id.to_string()))?;

        Ok(ResolvedSigner {
            account_id,
            public_key,
            key_ref_id,
        })
    }

    fn resolve_operator(&self) -> Result<ResolvedSigner, KeyResolverError> {
        let operator = self
            .operators
            .operator(self.network)?
            .ok_or(KeyResolverError::NoOperator(self.network))?;
        let public_key = self
            .kms
            .get_public_key(&operator.key_ref_id)?
            .ok_or_else(|| KeyResolverError::DanglingKeyRef(operator.key_ref_id.to_string()))?;

        Ok(ResolvedSigner {
            account_id: operator.account_id,
            public_key,
            key_ref_id: operator.key_ref_id,
        })
    }
}
