// Key storage managers
//
// A manager only stores, retrieves and deletes opaque bytes under a key
// reference id. The key store picks a manager by name; nothing else ever
// talks to a manager directly.

use super::cipher::MasterSecret;
use super::{KeyRefId, KmsError, SecretBytes};

/// Manager that keeps material unencrypted. Opt-in only.
pub const PLAINTEXT_MANAGER: &str = "local";

/// Manager that seals material with AES-256-GCM. The default.
pub const ENCRYPTED_MANAGER: &str = "local_encrypted";

/// Storage strategy for raw private key bytes
pub trait KeyStorageManager: Send + Sync {
    /// Name used to select this manager and recorded on every key handle
    fn name(&self) -> &str;

    fn store(&self, key_ref_id: &KeyRefId, material: &[u8]) -> Result<(), KmsError>;

    fn retrieve(&self, key_ref_id: &KeyRefId) -> Result<Option<SecretBytes>, KmsError>;

    fn delete(&self, key_ref_id: &KeyRefId) -> Result<(), KmsError>;
}

// ============================================================================
// PLAINTEXT MANAGER
// ============================================================================

/// Stores material as-is in its own tree
///
/// Anyone who can read the store directory can read these keys.
pub struct PlaintextManager {
    tree: sled::Tree,
}

impl PlaintextManager {
    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }
}

impl KeyStorageManager for PlaintextManager {
    fn name(&self) -> &str {
        PLAINTEXT_MANAGER
    }

    fn store(&self, key_ref_id: &KeyRefId, material: &[u8]) -> Result<(), KmsError> {
        self.tree.insert(key_ref_id.as_str(), material)?;
        Ok(())
    }

    fn retrieve(&self, key_ref_id: &KeyRefId) -> Result<Option<SecretBytes>, KmsError> {
        Ok(self
            .tree
            .get(key_ref_id.as_str())?
            .map(|v| SecretBytes::new(v.to_vec())))
    }

    fn delete(&self, key_ref_id: &KeyRefId) -> Result<(), KmsError> {
        self.tree.remove(key_ref_id.as_str())?;
        Ok(())
    }
}

// ============================================================================
// ENCRYPTED MANAGER
// ============================================================================

/// Seals material under a master secret before it touches the tree
pub struct EncryptedManager {
    tree: sled::Tree,
    secret: MasterSecret,
}

impl EncryptedManager {
    pub fn new(tree: sled::Tree, secret: MasterSecret) -> Self {
        Self { tree, secret }
    }
}

impl KeyStorageManager for EncryptedManager {
    fn name(&self) -> &str {
        ENCRYPTED_MANAGER
    }

    fn store(&self, key_ref_id: &KeyRefId, material: &[u8]) -> Result<(), KmsError> {
        let sealed = self.secret.seal(key_ref_id.as_str().as_bytes(), material)?;
        self.tree.insert(key_ref_id.as_str(), sealed)?;
        Ok(())
    }

    fn retrieve(&self, key_ref_id: &KeyRefId) -> Result<Option<SecretBytes>, KmsError> {
        match self.tree.get(key_ref_id.as_str())? {
            Some(sealed) => {
                let material = self.secret.open(key_ref_id.as_str().as_bytes(), &sealed)?;
                Ok(Some(material))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key_ref_id: &KeyRefId) -> Result<(), KmsError> {
        self.tree.remove(key_ref_id.as_str())?;
        Ok(())
    }
}
