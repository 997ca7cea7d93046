use super::KmsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature scheme of a stored key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    Ed25519,
    /// ECDSA over secp256k1
    Ecdsa,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::Ecdsa => "ecdsa",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = KmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            "ecdsa" | "secp256k1" | "ecdsa_secp256k1" | "ecdsa-secp256k1" => Ok(KeyAlgorithm::Ecdsa),
            _ => Err(KmsError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}
