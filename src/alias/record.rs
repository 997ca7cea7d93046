use super::AliasError;
use crate::kms::{KeyRefId, PublicKey};
use crate::types::{EntityId, EntityType, EvmAddress, Network};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_ALIAS_LEN: usize = 64;

/// Check alias syntax: an ASCII letter followed by letters, digits, '-' or '_'
///
/// Starting with a letter keeps aliases disjoint from entity ids and EVM
/// addresses.
pub fn validate_alias(alias: &str) -> Result<(), AliasError> {
    let invalid = |reason: &str| AliasError::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    };

    let first = alias.chars().next().ok_or_else(|| invalid("alias cannot be empty"))?;
    if alias.len() > MAX_ALIAS_LEN {
        return Err(invalid(&format!("longer than {} characters", MAX_ALIAS_LEN)));
    }
    if !first.is_ascii_alphabetic() {
        return Err(invalid("must start with a letter"));
    }
    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}

/// A name bound to a ledger entity on one network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub alias: String,
    pub entity_type: EntityType,
    pub network: Network,
    /// Absent while the entity is not yet known to the ledger
    pub entity_id: Option<EntityId>,
    pub evm_address: Option<EvmAddress>,
    pub public_key: Option<PublicKey>,
    /// Handle of the signing key, when the alias owns one
    pub key_ref_id: Option<KeyRefId>,
    pub created_at: DateTime<Utc>,
}

impl AliasRecord {
    pub fn new(alias: &str, entity_type: EntityType, network: Network) -> Self {
        Self {
            alias: alias.to_string(),
            entity_type,
            network,
            entity_id: None,
            evm_address: None,
            public_key: None,
            key_ref_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_evm_address(mut self, evm_address: EvmAddress) -> Self {
        self.evm_address = Some(evm_address);
        self
    }

    /// Attach a signing key: its handle and public key
    pub fn with_key(mut self, key_ref_id: KeyRefId, public_key: PublicKey) -> Self {
        self.key_ref_id = Some(key_ref_id);
        self.public_key = Some(public_key);
        self
    }

    pub fn has_key(&self) -> bool {
        self.key_ref_id.is_some()
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, AliasError> {
        postcard::from_bytes(bytes).map_err(|e| AliasError::Serialization(e.to_string()))
    }
}
