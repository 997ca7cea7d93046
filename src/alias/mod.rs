// Alias module - human-readable names for ledger entities
// Records are scoped by (alias, entity type, network)

mod error;
mod record;
mod store;

pub use error::AliasError;
pub use record::{validate_alias, AliasRecord, MAX_ALIAS_LEN};
pub use store::{AliasFilter, AliasService, AliasStore};
