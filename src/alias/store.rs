// AliasStore - persisted name directory
//
// Two trees:
// - records: "<network>/<entity_type>/<alias>" -> AliasRecord
// - names:   "<network>/<alias>"               -> entity types using the name
//
// Every write touching both trees runs in one sled transaction, so a
// concurrent register of the same key cannot also succeed.

use super::record::validate_alias;
use super::{AliasError, AliasRecord};
use crate::storage::{trees, CliStore};
use crate::types::{EntityType, EvmAddress, Network};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use tracing::info;

/// Lookup surface the resolvers depend on
pub trait AliasService: Send + Sync {
    /// Exact-match lookup
    fn resolve(
        &self,
        alias: &str,
        entity_type: EntityType,
        network: Network,
    ) -> Result<Option<AliasRecord>, AliasError>;

    /// Exact-match lookup that treats absence as an error
    fn resolve_or_throw(
        &self,
        alias: &str,
        entity_type: EntityType,
        network: Network,
    ) -> Result<AliasRecord, AliasError> {
        self.resolve(alias, entity_type, network)?
            .ok_or_else(|| AliasError::NotFound {
                alias: alias.to_string(),
                entity_type,
                network,
            })
    }
}

/// Filter for [`AliasStore::list`]
#[derive(Clone, Copy, Debug, Default)]
pub struct AliasFilter {
    pub network: Option<Network>,
    pub entity_type: Option<EntityType>,
}

impl AliasFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    fn matches(&self, record: &AliasRecord) -> bool {
        self.network.map_or(true, |n| n == record.network)
            && self.entity_type.map_or(true, |t| t == record.entity_type)
    }
}

fn record_key(alias: &str, entity_type: EntityType, network: Network) -> String {
    format!("{}/{}/{}", network, entity_type, alias)
}

fn name_key(alias: &str, network: Network) -> String {
    format!("{}/{}", network, alias)
}

fn decode_types(bytes: Option<&[u8]>) -> Result<Vec<EntityType>, AliasError> {
    match bytes {
        Some(bytes) => {
            postcard::from_bytes(bytes).map_err(|e| AliasError::Serialization(e.to_string()))
        }
        None => Ok(Vec::new()),
    }
}

fn join_types(types: &[EntityType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn flatten(err: TransactionError<AliasError>) -> AliasError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => AliasError::Database(e.to_string()),
    }
}

/// Name directory over the shared CLI store
#[derive(Clone)]
pub struct AliasStore {
    records: sled::Tree,
    names: sled::Tree,
}

impl AliasStore {
    pub fn new(records: sled::Tree, names: sled::Tree) -> Self {
        Self { records, names }
    }

    pub fn open(store: &CliStore) -> Result<Self, AliasError> {
        Ok(Self::new(
            store.tree(trees::ALIASES)?,
            store.tree(trees::ALIAS_NAMES)?,
        ))
    }

    // ========================================================================
    // REGISTER
    // ========================================================================

    /// Register a record; fails if `(alias, entity_type, network)` exists
    pub fn register(&self, record: &AliasRecord) -> Result<(), AliasError> {
        self.insert(record, false)
    }

    /// Register a record only if the alias is unused by every entity type
    /// on that network. The availability check and the insert are atomic.
    pub fn register_exclusive(&self, record: &AliasRecord) -> Result<(), AliasError> {
        self.insert(record, true)
    }

    fn insert(&self, record: &AliasRecord, exclusive: bool) -> Result<(), AliasError> {
        validate_alias(&record.alias)?;

        let rkey = record_key(&record.alias, record.entity_type, record.network);
        let nkey = name_key(&record.alias, record.network);
        let value = record.to_bytes();

        (&self.records, &self.names)
            .transaction(|(records, names)| {
                if records.get(rkey.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(AliasError::AlreadyExists {
                        alias: record.alias.clone(),
                        entity_type: record.entity_type,
                        network: record.network,
                    }));
                }

                let current = names.get(nkey.as_bytes())?;
                let mut types = decode_types(current.as_deref())
                    .map_err(ConflictableTransactionError::Abort)?;

                if exclusive && !types.is_empty() {
                    return Err(ConflictableTransactionError::Abort(AliasError::Taken {
                        alias: record.alias.clone(),
                        network: record.network,
                        used_by: join_types(&types),
                    }));
                }

                types.push(record.entity_type);
                let encoded = postcard::to_allocvec(&types).unwrap_or_default();

                records.insert(rkey.as_bytes(), value.clone())?;
                names.insert(nkey.as_bytes(), encoded)?;
                Ok(())
            })
            .map_err(flatten)?;

        info!(
            alias = %record.alias,
            entity_type = %record.entity_type,
            network = %record.network,
            "registered alias"
        );
        Ok(())
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Reverse lookup by EVM address on one network
    pub fn resolve_by_evm_address(
        &self,
        address: &EvmAddress,
        network: Network,
    ) -> Result<Option<AliasRecord>, AliasError> {
        let prefix = format!("{}/", network);
        for entry in self.records.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            let record = AliasRecord::from_bytes(&bytes)?;
            if record.evm_address.as_ref() == Some(address) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// All records matching the filter
    pub fn list(&self, filter: AliasFilter) -> Result<Vec<AliasRecord>, AliasError> {
        let iter = match filter.network {
            Some(network) => self.records.scan_prefix(format!("{}/", network).as_bytes()),
            None => self.records.iter(),
        };

        let mut records = Vec::new();
        for entry in iter {
            let (_, bytes) = entry?;
            let record = AliasRecord::from_bytes(&bytes)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn exists(
        &self,
        alias: &str,
        entity_type: EntityType,
        network: Network,
    ) -> Result<bool, AliasError> {
        Ok(self
            .records
            .contains_key(record_key(alias, entity_type, network).as_bytes())?)
    }

    /// Fail if the alias is used by any entity type on `network`
    pub fn available_or_throw(&self, alias: &str, network: Network) -> Result<(), AliasError> {
        let current = self.names.get(name_key(alias, network).as_bytes())?;
        let types = decode_types(current.as_deref())?;
        if types.is_empty() {
            Ok(())
        } else {
            Err(AliasError::Taken {
                alias: alias.to_string(),
                network,
                used_by: join_types(&types),
            })
        }
    }

    // ========================================================================
    // REMOVE
    // ========================================================================

    /// Remove every record of `alias` on `network`, whatever its entity type
    ///
    /// Returns the removed records; empty when the alias did not exist.
    pub fn remove(&self, alias: &str, network: Network) -> Result<Vec<AliasRecord>, AliasError> {
        let nkey = name_key(alias, network);

        let removed = (&self.records, &self.names)
            .transaction(|(records, names)| {
                let current = names.get(nkey.as_bytes())?;
                let types = decode_types(current.as_deref())
                    .map_err(ConflictableTransactionError::Abort)?;

                let mut removed = Vec::with_capacity(types.len());
                for entity_type in types {
                    let rkey = record_key(alias, entity_type, network);
                    if let Some(bytes) = records.remove(rkey.as_bytes())? {
                        let record = AliasRecord::from_bytes(&bytes)
                            .map_err(ConflictableTransactionError::Abort)?;
                        removed.push(record);
                    }
                }
                names.remove(nkey.as_bytes())?;
                Ok(removed)
            })
            .map_err(flatten)?;

        if !removed.is_empty() {
            info!(alias = %alias, network = %network, count = removed.len(), "removed alias");
        }
        Ok(removed)
    }

    /// Drop every record. Testing and reset only.
    pub fn clear(&self) -> Result<(), AliasError> {
        self.records.clear()?;
        self.names.clear()?;
        Ok(())
    }
}

impl AliasService for AliasStore {
    fn resolve(
        &self,
        alias: &str,
        entity_type: EntityType,
        network: Network,
    ) -> Result<Option<AliasRecord>, AliasError> {
        match self
            .records
            .get(record_key(alias, entity_type, network).as_bytes())?
        {
            Some(bytes) => Ok(Some(AliasRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}
