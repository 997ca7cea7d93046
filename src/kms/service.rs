// KeyStore - sole owner of private key material
//
// Callers get opaque KeyRefIds and public artifacts. Material goes to a
// storage manager; metadata (algorithm, manager, public key, tags) goes to
// the key record tree. The two are linked only by the KeyRefId.

use super::keys::PrivateKey;
use super::manager::KeyStorageManager;
use super::{KeyAlgorithm, KmsError, PublicKey};
use crate::storage::{trees, CliStore};
use crate::types::EvmAddress;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

const KEY_REF_PREFIX: &str = "kr_";

/// Opaque reference to stored key material
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRefId(String);

impl KeyRefId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{}{}", KEY_REF_PREFIX, hex::encode(bytes)))
    }

    /// Wrap an id received from the user or an alias record
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata describing a stored key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHandle {
    pub key_ref_id: KeyRefId,
    pub algorithm: KeyAlgorithm,
    pub manager_name: String,
    pub public_key: PublicKey,
    /// Provenance labels, e.g. the command or alias that created the key
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl KeyHandle {
    fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, KmsError> {
        postcard::from_bytes(bytes).map_err(|e| KmsError::Serialization(e.to_string()))
    }
}

/// Result of creating or importing a key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedKey {
    pub key_ref_id: KeyRefId,
    pub public_key: PublicKey,
}

/// Key store over a record tree and a set of named storage managers
pub struct KeyStore {
    records: sled::Tree,
    managers: HashMap<String, Box<dyn KeyStorageManager>>,
}

impl KeyStore {
    /// Create a key store with no managers registered
    pub fn new(records: sled::Tree) -> Self {
        Self {
            records,
            managers: HashMap::new(),
        }
    }

    /// Open the key record tree of a CLI store
    pub fn open(store: &CliStore) -> Result<Self, KmsError> {
        Ok(Self::new(store.tree(trees::KEY_RECORDS)?))
    }

    /// Register a storage manager (builder style)
    pub fn with_manager(mut self, manager: Box<dyn KeyStorageManager>) -> Self {
        self.register_manager(manager);
        self
    }

    /// Register a storage manager, replacing one with the same name
    pub fn register_manager(&mut self, manager: Box<dyn KeyStorageManager>) {
        self.managers.insert(manager.name().to_string(), manager);
    }

    pub fn has_manager(&self, name: &str) -> bool {
        self.managers.contains_key(name)
    }

    // ========================================================================
    // CREATE / IMPORT
    // ========================================================================

    /// Generate a new key pair and persist the private half through `manager_name`
    pub fn create_local_private_key(
        &self,
        algorithm: KeyAlgorithm,
        manager_name: &str,
        tags: &[String],
    ) -> Result<CreatedKey, KmsError> {
        let manager = self.manager(manager_name)?;
        let key = PrivateKey::generate(algorithm);
        self.persist(&key, manager, tags)
    }

    /// Import private key text (DER, raw hex or 0x hex)
    ///
    /// Importing a key that is already stored returns the existing handle,
    /// with the new tags merged in.
    pub fn import_private_key(
        &self,
        algorithm: KeyAlgorithm,
        raw_key_text: &str,
        manager_name: &str,
        tags: &[String],
    ) -> Result<CreatedKey, KmsError> {
        let manager = self.manager(manager_name)?;
        let key = PrivateKey::from_text(algorithm, raw_key_text)?;
        self.persist(&key, manager, tags)
    }

    /// Import private key text only if it derives `expected_public_key`
    ///
    /// Nothing is written when the keys disagree.
    pub fn import_and_validate_private_key(
        &self,
        algorithm: KeyAlgorithm,
        raw_key_text: &str,
        expected_public_key: &str,
        manager_name: &str,
        tags: &[String],
    ) -> Result<KeyRefId, KmsError> {
        let manager = self.manager(manager_name)?;
        let expected = PublicKey::parse(algorithm, expected_public_key)?;
        let key = PrivateKey::from_text(algorithm, raw_key_text)?;

        let derived = key.public_key();
        if derived != expected {
            return Err(KmsError::PublicKeyMismatch {
                expected: expected.to_hex(),
                derived: derived.to_hex(),
            });
        }

        Ok(self.persist(&key, manager, tags)?.key_ref_id)
    }

    fn persist(
        &self,
        key: &PrivateKey,
        manager: &dyn KeyStorageManager,
        tags: &[String],
    ) -> Result<CreatedKey, KmsError> {
        let public_key = key.public_key();

        if let Some(mut existing) = self.find_by_public_key(&public_key)? {
            let before = existing.tags.len();
            for tag in tags {
                if !existing.tags.contains(tag) {
                    existing.tags.push(tag.clone());
                }
            }

            if existing.manager_name != manager.name() {
                self.migrate(key, &mut existing, manager)?;
            } else if existing.tags.len() != before {
                self.records
                    .insert(existing.key_ref_id.as_str(), existing.to_bytes())?;
            }
            debug!(key_ref_id = %existing.key_ref_id, "key already stored, reusing handle");
            return Ok(CreatedKey {
                key_ref_id: existing.key_ref_id,
                public_key,
            });
        }

        let handle = KeyHandle {
            key_ref_id: KeyRefId::generate(),
            algorithm: key.algorithm(),
            manager_name: manager.name().to_string(),
            public_key: public_key.clone(),
            tags: tags.to_vec(),
            created_at: Utc::now(),
        };

        manager.store(&handle.key_ref_id, key.scalar().expose())?;
        if let Err(e) = self
            .records
            .insert(handle.key_ref_id.as_str(), handle.to_bytes())
        {
            // Roll back so no orphaned material outlives a failed import
            let _ = manager.delete(&handle.key_ref_id);
            return Err(e.into());
        }

        info!(
            key_ref_id = %handle.key_ref_id,
            algorithm = %handle.algorithm,
            manager = %handle.manager_name,
            "stored key"
        );

        Ok(CreatedKey {
            key_ref_id: handle.key_ref_id,
            public_key,
        })
    }

    /// Move stored material from its current manager to `target`
    fn migrate(
        &self,
        key: &PrivateKey,
        handle: &mut KeyHandle,
        target: &dyn KeyStorageManager,
    ) -> Result<(), KmsError> {
        let source = self.manager(&handle.manager_name)?;

        target.store(&handle.key_ref_id, key.scalar().expose())?;
        let from = std::mem::replace(&mut handle.manager_name, target.name().to_string());
        if let Err(e) = self
            .records
            .insert(handle.key_ref_id.as_str(), handle.to_bytes())
        {
            let _ = target.delete(&handle.key_ref_id);
            handle.manager_name = from;
            return Err(e.into());
        }
        source.delete(&handle.key_ref_id)?;

        info!(
            key_ref_id = %handle.key_ref_id,
            from = %from,
            to = %handle.manager_name,
            "moved key material"
        );
        Ok(())
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Get the handle of a stored key
    pub fn get(&self, key_ref_id: &KeyRefId) -> Result<Option<KeyHandle>, KmsError> {
        match self.records.get(key_ref_id.as_str())? {
            Some(bytes) => Ok(Some(KeyHandle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get the public key of a stored key
    pub fn get_public_key(&self, key_ref_id: &KeyRefId) -> Result<Option<PublicKey>, KmsError> {
        Ok(self.get(key_ref_id)?.map(|handle| handle.public_key))
    }

    /// List every stored key handle
    pub fn list(&self) -> Result<Vec<KeyHandle>, KmsError> {
        let mut handles = Vec::new();
        for entry in self.records.iter() {
            let (_, bytes) = entry?;
            handles.push(KeyHandle::from_bytes(&bytes)?);
        }
        Ok(handles)
    }

    /// Find the handle holding a given public key
    pub fn find_by_public_key(&self, public_key: &PublicKey) -> Result<Option<KeyHandle>, KmsError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|handle| &handle.public_key == public_key))
    }

    /// EVM address of a stored ECDSA key
    pub fn evm_address(&self, key_ref_id: &KeyRefId) -> Result<EvmAddress, KmsError> {
        let handle = self
            .get(key_ref_id)?
            .ok_or_else(|| KmsError::KeyNotFound(key_ref_id.to_string()))?;
        handle.public_key.evm_address()
    }

    // ========================================================================
    // SIGN / REMOVE
    // ========================================================================

    /// Sign a message with a stored key
    ///
    /// ED25519 signs the message; ECDSA signs keccak256(message).
    pub fn sign(&self, key_ref_id: &KeyRefId, message: &[u8]) -> Result<Vec<u8>, KmsError> {
        let handle = self
            .get(key_ref_id)?
            .ok_or_else(|| KmsError::KeyNotFound(key_ref_id.to_string()))?;
        let manager = self.manager(&handle.manager_name)?;
        let material = manager
            .retrieve(key_ref_id)?
            .ok_or_else(|| KmsError::MissingMaterial(key_ref_id.to_string()))?;

        let key = PrivateKey::from_scalar(handle.algorithm, material.expose())?;
        if key.public_key() != handle.public_key {
            return Err(KmsError::MissingMaterial(format!(
                "{} (stored material does not match its public key)",
                key_ref_id
            )));
        }

        debug!(key_ref_id = %key_ref_id, "signing");
        Ok(key.sign(message))
    }

    /// Remove a stored key and its material
    ///
    /// Returns `false` when no such key exists. Fails without touching the
    /// record when its storage manager is not registered.
    pub fn remove(&self, key_ref_id: &KeyRefId) -> Result<bool, KmsError> {
        let Some(handle) = self.get(key_ref_id)? else {
            return Ok(false);
        };

        self.manager(&handle.manager_name)?.delete(key_ref_id)?;
        self.records.remove(key_ref_id.as_str())?;

        info!(key_ref_id = %key_ref_id, "removed key");
        Ok(true)
    }

    fn manager(&self, name: &str) -> Result<&dyn KeyStorageManager, KmsError> {
        self.managers
            .get(name)
            .map(|m| m.as_ref())
            .ok_or_else(|| KmsError::UnknownManager(name.to_string()))
    }
}
