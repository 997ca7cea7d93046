//! Alias, key-store and identity resolution core of a ledger CLI.
//!
//! - [`kms`]: private keys behind opaque [`kms::KeyRefId`] handles
//! - [`alias`]: names for accounts, tokens, topics and contracts per network
//! - [`resolver`]: signer arguments and entity references to canonical identities
//! - [`config`]: CLI settings and the [`config::Context`] that wires it all up

pub mod alias;
pub mod config;
pub mod kms;
pub mod resolver;
pub mod storage;
pub mod types;
