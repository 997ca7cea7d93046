use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeParseError {
    #[error("Unknown network '{0}': expected mainnet, testnet, previewnet or localnet")]
    UnknownNetwork(String),

    #[error("Unknown entity type '{0}': expected account, token, topic or contract")]
    UnknownEntityType(String),

    #[error("Invalid entity id '{0}': expected shard.realm.num")]
    InvalidEntityId(String),

    #[error("Invalid EVM address '{0}': expected 20 bytes of hex")]
    InvalidEvmAddress(String),
}

/// Ledger network an alias or operator belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Previewnet,
    Localnet,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Testnet,
        Network::Previewnet,
        Network::Localnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Previewnet => "previewnet",
            Network::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "previewnet" => Ok(Network::Previewnet),
            "localnet" | "local" => Ok(Network::Localnet),
            _ => Err(TypeParseError::UnknownNetwork(s.to_string())),
        }
    }
}

/// Kind of ledger entity an alias can name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Account,
    Token,
    Topic,
    Contract,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Account,
        EntityType::Token,
        EntityType::Topic,
        EntityType::Contract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Account => "account",
            EntityType::Token => "token",
            EntityType::Topic => "topic",
            EntityType::Contract => "contract",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "account" => Ok(EntityType::Account),
            "token" => Ok(EntityType::Token),
            "topic" => Ok(EntityType::Topic),
            "contract" => Ok(EntityType::Contract),
            _ => Err(TypeParseError::UnknownEntityType(s.to_string())),
        }
    }
}
