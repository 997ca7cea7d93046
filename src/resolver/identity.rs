// IdentityResolver - normalizes alias / entity id / EVM address references
//
// Alias references go through the alias store, the other kinds pass
// straight through. Account and contract detail always comes from the
// ledger query service, never from the alias record alone.

use super::reference::{EntityOrEvmAddress, EntityReference, ReferenceKind};
use super::{LedgerQueryService, ResolveError};
use crate::alias::{AliasRecord, AliasService};
use crate::kms::PublicKey;
use crate::types::{EntityId, EntityType, EvmAddress, Network};
use tracing::{debug, warn};

/// Account identity confirmed against the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub account_id: EntityId,
    pub account_public_key: PublicKey,
    pub evm_address: EvmAddress,
}

/// Contract identity confirmed against the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedContract {
    pub contract_id: EntityId,
    pub evm_address: EvmAddress,
}

pub struct IdentityResolver<A: AliasService, Q: LedgerQueryService> {
    aliases: A,
    ledger: Q,
}

impl<A: AliasService, Q: LedgerQueryService> IdentityResolver<A, Q> {
    pub fn new(aliases: A, ledger: Q) -> Self {
        Self { aliases, ledger }
    }

    pub fn aliases(&self) -> &A {
        &self.aliases
    }

    pub fn ledger(&self) -> &Q {
        &self.ledger
    }

    /// Resolve an account reference to its ledger-reported identity
    pub async fn resolve_account(
        &self,
        account_reference: &str,
        kind: ReferenceKind,
        network: Network,
    ) -> Result<ResolvedAccount, ResolveError> {
        let reference = EntityReference::parse(account_reference, kind)?;
        let (lookup, record) = self.lookup_target(&reference, EntityType::Account, network)?;

        let info = self
            .ledger
            .get_account(network, &lookup)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                reference: lookup.clone(),
                network,
            })?;

        let account_public_key = info
            .account_public_key
            .ok_or(ResolveError::MissingPublicKey(info.account_id))?;
        let evm_address = info
            .evm_address
            .unwrap_or_else(|| info.account_id.to_long_zero_address());

        if let Some(record) = &record {
            check_alias_record(record, &info.account_id, Some(&account_public_key), &evm_address)?;
        }

        debug!(reference = %account_reference, account_id = %info.account_id, "resolved account");
        Ok(ResolvedAccount {
            account_id: info.account_id,
            account_public_key,
            evm_address,
        })
    }

    /// Resolve a contract reference to its ledger-reported identity
    pub async fn resolve_contract(
        &self,
        contract_reference: &str,
        kind: ReferenceKind,
        network: Network,
    ) -> Result<ResolvedContract, ResolveError> {
        let reference = EntityReference::parse(contract_reference, kind)?;
        let (lookup, record) = self.lookup_target(&reference, EntityType::Contract, network)?;

        let info = self
            .ledger
            .get_contract_info(network, &lookup)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                reference: lookup.clone(),
                network,
            })?;

        let evm_address = info
            .evm_address
            .unwrap_or_else(|| info.contract_id.to_long_zero_address());

        if let Some(record) = &record {
            check_alias_record(record, &info.contract_id, None, &evm_address)?;
        }

        debug!(reference = %contract_reference, contract_id = %info.contract_id, "resolved contract");
        Ok(ResolvedContract {
            contract_id: info.contract_id,
            evm_address,
        })
    }

    /// Resolve a reference to an entity id or EVM address without
    /// contacting the ledger. Only aliases are looked up, under `alias_type`.
    pub fn resolve_reference_to_entity_or_evm_address(
        &self,
        entity_reference: &str,
        reference_kind: ReferenceKind,
        network: Network,
        alias_type: EntityType,
    ) -> Result<EntityOrEvmAddress, ResolveError> {
        match EntityReference::parse(entity_reference, reference_kind)? {
            EntityReference::Alias(alias) => {
                let (entity_id, _) = self.alias_entity(&alias, alias_type, network)?;
                Ok(EntityOrEvmAddress::EntityId(entity_id))
            }
            EntityReference::EntityId(id) => Ok(EntityOrEvmAddress::EntityId(id)),
            EntityReference::EvmAddress(address) => Ok(EntityOrEvmAddress::EvmAddress(address)),
        }
    }

    /// The string to hand the ledger, plus the alias record it came from
    fn lookup_target(
        &self,
        reference: &EntityReference,
        alias_type: EntityType,
        network: Network,
    ) -> Result<(String, Option<AliasRecord>), ResolveError> {
        match reference {
            EntityReference::Alias(alias) => {
                let (entity_id, record) = self.alias_entity(alias, alias_type, network)?;
                Ok((entity_id.to_string(), Some(record)))
            }
            EntityReference::EntityId(id) => Ok((id.to_string(), None)),
            EntityReference::EvmAddress(address) => Ok((address.to_string(), None)),
        }
    }

    fn alias_entity(
        &self,
        alias: &str,
        alias_type: EntityType,
        network: Network,
    ) -> Result<(EntityId, AliasRecord), ResolveError> {
        let record = self.aliases.resolve_or_throw(alias, alias_type, network)?;
        let entity_id = record.entity_id.ok_or_else(|| ResolveError::MissingEntityId {
            alias: alias.to_string(),
            network,
        })?;
        Ok((entity_id, record))
    }
}

/// Compare a cached alias record with ledger state
///
/// A different entity id is an error; differing key or address only means
/// the cache is stale (e.g. after a key rotation) and is logged.
fn check_alias_record(
    record: &AliasRecord,
    ledger_id: &EntityId,
    ledger_public_key: Option<&PublicKey>,
    ledger_evm_address: &EvmAddress,
) -> Result<(), ResolveError> {
    if let Some(expected) = record.entity_id {
        if &expected != ledger_id {
            return Err(ResolveError::Inconsistent {
                alias: record.alias.clone(),
                expected,
                found: *ledger_id,
            });
        }
    }

    if let (Some(cached), Some(current)) = (record.public_key.as_ref(), ledger_public_key) {
        if cached != current {
            warn!(alias = %record.alias, network = %record.network, "alias public key is stale, using ledger key");
        }
    }
    if let Some(cached) = record.evm_address.as_ref() {
        if cached != ledger_evm_address {
            warn!(alias = %record.alias, network = %record.network, "alias EVM address is stale, using ledger address");
        }
    }
    Ok(())
}
