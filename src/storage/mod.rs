// Storage module - PERSISTENCE
// One sled database per CLI installation, shared by every command invocation

mod store;

pub use store::{trees, CliStore, StorageStats, StoreError};
