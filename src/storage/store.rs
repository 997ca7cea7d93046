// CliStore - Persistent key-value storage using sled
//
// Holds every namespace the CLI persists:
// - Alias records and the per-network name index
// - Key metadata (handles) and per-manager key material
// - Per-network operator settings
//
// sled takes an exclusive file lock on open, so two concurrent CLI processes
// never share a writable database. Within a process, multi-tree updates go
// through sled transactions.

use crate::types::ErrorKind;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Tree names for organizing data
pub mod trees {
    pub const ALIASES: &str = "alias:records";
    pub const ALIAS_NAMES: &str = "alias:names";
    pub const KEY_RECORDS: &str = "kms:records";
    pub const KEY_MATERIAL_PLAINTEXT: &str = "kms:material:plaintext";
    pub const KEY_MATERIAL_ENCRYPTED: &str = "kms:material:encrypted";
    pub const OPERATORS: &str = "network:operators";
}

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database is locked by another process: {0}")]
    Locked(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of named trees
    pub tree_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store shared by the alias directory, key store and operator settings
#[derive(Clone)]
pub struct CliStore {
    db: sled::Db,
}

impl CliStore {
    /// Open or create a store at the given path, failing fast if it is locked
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_timeout(path, Duration::ZERO)
    }

    /// Open or create a store, waiting up to `lock_timeout` for another
    /// process to release its lock on the database
    pub fn open_with_timeout<P: AsRef<Path>>(
        path: P,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let deadline = Instant::now() + lock_timeout;

        loop {
            match sled::open(path.as_ref()) {
                Ok(db) => return Ok(Self { db }),
                Err(sled::Error::Io(e)) if is_lock_error(&e) => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked(e.to_string()));
                    }
                    debug!(path = %path.as_ref().display(), "store locked, waiting");
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(StoreError::OpenFailed(e.to_string())),
            }
        }
    }

    /// Open a throwaway store that is removed on drop
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Open (or create) a named tree
    pub fn tree(&self, name: &str) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(name)?)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            tree_count: self.db.tree_names().len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }
}

/// sled 0.34 wraps a failed `try_lock_exclusive` on its db file as
/// `io::ErrorKind::Other` with the message "could not acquire lock on <path>: ..."
const SLED_LOCK_MESSAGE: &str = "could not acquire lock on";

fn is_lock_error(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock || err.to_string().starts_with(SLED_LOCK_MESSAGE)
}
