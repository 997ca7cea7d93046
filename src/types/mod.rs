// Types module - ledger identifiers shared by every component
// Networks, entity kinds, entity ids and EVM addresses

mod entity;
mod error;
mod network;

pub use entity::*;
pub use error::ErrorKind;
pub use network::*;
