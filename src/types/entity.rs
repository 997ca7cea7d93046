use super::TypeParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical ledger identifier in `shard.realm.num` form
///
/// Shards are 32-bit: the long-zero EVM address has four bytes for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub shard: u32,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub fn new(shard: u32, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Check whether a string has the `shard.realm.num` shape
    pub fn is_entity_id(s: &str) -> bool {
        s.parse::<EntityId>().is_ok()
    }

    /// The "long-zero" EVM address the ledger assigns to entities without
    /// an ECDSA-derived address: shard (4 bytes) | realm (8) | num (8).
    pub fn to_long_zero_address(&self) -> EvmAddress {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(&self.shard.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..20].copy_from_slice(&self.num.to_be_bytes());
        EvmAddress(bytes)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeParseError::InvalidEntityId(s.to_string());

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(parts.iter()) {
            // u64::from_str accepts a leading '+', the ledger does not
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        let shard = u32::try_from(nums[0]).map_err(|_| invalid())?;
        Ok(Self::new(shard, nums[1], nums[2]))
    }
}

/// 20-byte EVM-compatible address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvmAddress([u8; 20]);

impl EvmAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check whether a string is `0x` followed by 40 hex characters
    pub fn is_evm_address(s: &str) -> bool {
        let s = s.trim();
        (s.starts_with("0x") || s.starts_with("0X")) && s.parse::<EvmAddress>().is_ok()
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for EvmAddress {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 40 {
            return Err(TypeParseError::InvalidEvmAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| TypeParseError::InvalidEvmAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}
