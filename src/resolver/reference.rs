// Entity references
//
// A reference is one of three closed kinds, each with its own syntax. The
// kind is declared by the caller; nothing is sniffed at resolution time.

use super::ResolveError;
use crate::alias::validate_alias;
use crate::types::{EntityId, EvmAddress};
use std::fmt;
use std::str::FromStr;

/// Declared kind of a user-supplied reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Alias,
    EntityId,
    EvmAddress,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Alias => "alias",
            ReferenceKind::EntityId => "entity-id",
            ReferenceKind::EvmAddress => "evm-address",
        };
        f.write_str(name)
    }
}

impl FromStr for ReferenceKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "alias" => Ok(ReferenceKind::Alias),
            "entity-id" | "id" => Ok(ReferenceKind::EntityId),
            "evm-address" | "evm" => Ok(ReferenceKind::EvmAddress),
            _ => Err(ResolveError::UnknownReferenceKind(s.to_string())),
        }
    }
}

/// A parsed reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityReference {
    Alias(String),
    EntityId(EntityId),
    EvmAddress(EvmAddress),
}

impl EntityReference {
    /// Parse `reference` with the syntax of its declared kind
    pub fn parse(reference: &str, kind: ReferenceKind) -> Result<Self, ResolveError> {
        let reference = reference.trim();
        let invalid = |reason: String| ResolveError::InvalidReference {
            reference: reference.to_string(),
            kind,
            reason,
        };

        match kind {
            ReferenceKind::Alias => {
                validate_alias(reference).map_err(|e| invalid(e.to_string()))?;
                Ok(EntityReference::Alias(reference.to_string()))
            }
            ReferenceKind::EntityId => reference
                .parse::<EntityId>()
                .map(EntityReference::EntityId)
                .map_err(|e| invalid(e.to_string())),
            ReferenceKind::EvmAddress => {
                if !EvmAddress::is_evm_address(reference) {
                    return Err(invalid("expected 0x followed by 40 hex characters".into()));
                }
                reference
                    .parse::<EvmAddress>()
                    .map(EntityReference::EvmAddress)
                    .map_err(|e| invalid(e.to_string()))
            }
        }
    }

    /// Pick the kind from syntax alone, for CLI arguments that accept any
    /// of the three forms. The three syntaxes are disjoint.
    pub fn infer(reference: &str) -> Result<Self, ResolveError> {
        let trimmed = reference.trim();
        if EvmAddress::is_evm_address(trimmed) {
            Self::parse(trimmed, ReferenceKind::EvmAddress)
        } else if EntityId::is_entity_id(trimmed) {
            Self::parse(trimmed, ReferenceKind::EntityId)
        } else {
            Self::parse(trimmed, ReferenceKind::Alias)
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            EntityReference::Alias(_) => ReferenceKind::Alias,
            EntityReference::EntityId(_) => ReferenceKind::EntityId,
            EntityReference::EvmAddress(_) => ReferenceKind::EvmAddress,
        }
    }
}

/// Output of reference resolution for commands that accept either form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityOrEvmAddress {
    EntityId(EntityId),
    EvmAddress(EvmAddress),
}

impl fmt::Display for EntityOrEvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityOrEvmAddress::EntityId(id) => id.fmt(f),
            EntityOrEvmAddress::EvmAddress(address) => address.fmt(f),
        }
    }
}
