// Operator settings - the default signer of each network

use crate::kms::KeyRefId;
use crate::storage::{trees, CliStore, StoreError};
use crate::types::{EntityId, Network};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default signing identity of a network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub account_id: EntityId,
    pub key_ref_id: KeyRefId,
}

/// Per-network operator settings
#[derive(Clone)]
pub struct OperatorStore {
    tree: sled::Tree,
}

impl OperatorStore {
    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    pub fn open(store: &CliStore) -> Result<Self, StoreError> {
        Ok(Self::new(store.tree(trees::OPERATORS)?))
    }

    pub fn set_operator(&self, network: Network, operator: &Operator) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(operator).unwrap_or_default();
        self.tree.insert(network.as_str(), bytes)?;
        info!(network = %network, account_id = %operator.account_id, "set operator");
        Ok(())
    }

    pub fn operator(&self, network: Network) -> Result<Option<Operator>, StoreError> {
        match self.tree.get(network.as_str())? {
            Some(bytes) => postcard::from_bytes(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
            None => Ok(None),
        }
    }

    /// Returns `false` when no operator was set
    pub fn clear_operator(&self, network: Network) -> Result<bool, StoreError> {
        Ok(self.tree.remove(network.as_str())?.is_some())
    }
}
