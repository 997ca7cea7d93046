use super::encoding::{
    decode_private_key, decode_public_key, ECDSA_PUBLIC_DER_PREFIX, ED25519_PUBLIC_DER_PREFIX,
};
use super::{evm, KeyAlgorithm, KmsError};
use crate::types::EvmAddress;
use ed25519_dalek::{Signer as DalekSigner, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use zeroize::Zeroizing;

/// Owned secret bytes, zeroed on drop and never printed
///
/// Storage managers hand key material to the key store in this wrapper;
/// only the key store itself reads the contents.
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED; {}])", self.0.len())
    }
}

/// Public half of a stored key
///
/// ED25519 keys are 32 bytes; ECDSA keys are held as 33-byte compressed points.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Parse public key text (raw hex or DER, optional 0x) for a known algorithm
    pub fn parse(algorithm: KeyAlgorithm, text: &str) -> Result<Self, KmsError> {
        let bytes = decode_public_key(text, algorithm)?;
        Ok(Self { algorithm, bytes })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw hex without prefix
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// DER (SubjectPublicKeyInfo) hex
    pub fn to_der_hex(&self) -> String {
        let prefix: &[u8] = match self.algorithm {
            KeyAlgorithm::Ed25519 => &ED25519_PUBLIC_DER_PREFIX,
            KeyAlgorithm::Ecdsa => &ECDSA_PUBLIC_DER_PREFIX,
        };
        format!("{}{}", hex::encode(prefix), hex::encode(&self.bytes))
    }

    /// Derive the EVM address of this key (ECDSA only)
    pub fn evm_address(&self) -> Result<EvmAddress, KmsError> {
        evm::evm_address_from_public_key(self)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Private key held in memory only while the key store uses it
pub(crate) enum PrivateKey {
    Ed25519(SigningKey),
    Ecdsa(secp256k1::SecretKey),
}

impl PrivateKey {
    pub fn generate(algorithm: KeyAlgorithm) -> Self {
        match algorithm {
            KeyAlgorithm::Ed25519 => PrivateKey::Ed25519(SigningKey::generate(&mut OsRng)),
            KeyAlgorithm::Ecdsa => {
                PrivateKey::Ecdsa(secp256k1::SecretKey::new(&mut secp256k1::rand::thread_rng()))
            }
        }
    }

    /// Build a key from a raw 32-byte scalar
    pub fn from_scalar(algorithm: KeyAlgorithm, scalar: &[u8]) -> Result<Self, KmsError> {
        match algorithm {
            KeyAlgorithm::Ed25519 => {
                let bytes: [u8; 32] = scalar.try_into().map_err(|_| {
                    KmsError::InvalidKey(format!(
                        "ed25519 private key must be 32 bytes, got {}",
                        scalar.len()
                    ))
                })?;
                Ok(PrivateKey::Ed25519(SigningKey::from_bytes(&bytes)))
            }
            KeyAlgorithm::Ecdsa => {
                let key = secp256k1::SecretKey::from_slice(scalar)
                    .map_err(|_| KmsError::InvalidKey("not a valid secp256k1 scalar".into()))?;
                Ok(PrivateKey::Ecdsa(key))
            }
        }
    }

    /// Decode key text, checking any algorithm declared by its encoding
    /// against the requested one
    pub fn from_text(algorithm: KeyAlgorithm, text: &str) -> Result<Self, KmsError> {
        let decoded = decode_private_key(text)?;
        if let Some(found) = decoded.algorithm {
            if found != algorithm {
                return Err(KmsError::AlgorithmMismatch {
                    expected: algorithm,
                    found,
                });
            }
        }
        Self::from_scalar(algorithm, decoded.scalar.expose())
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PrivateKey::Ed25519(_) => KeyAlgorithm::Ed25519,
            PrivateKey::Ecdsa(_) => KeyAlgorithm::Ecdsa,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey {
                algorithm: KeyAlgorithm::Ed25519,
                bytes: key.verifying_key().to_bytes().to_vec(),
            },
            PrivateKey::Ecdsa(key) => {
                let secp = secp256k1::Secp256k1::signing_only();
                let public = secp256k1::PublicKey::from_secret_key(&secp, key);
                PublicKey {
                    algorithm: KeyAlgorithm::Ecdsa,
                    bytes: public.serialize().to_vec(),
                }
            }
        }
    }

    pub fn scalar(&self) -> SecretBytes {
        match self {
            PrivateKey::Ed25519(key) => SecretBytes::new(key.to_bytes().to_vec()),
            PrivateKey::Ecdsa(key) => SecretBytes::new(key.secret_bytes().to_vec()),
        }
    }

    /// ED25519 signs the message itself; ECDSA signs keccak256(message).
    /// Both return 64-byte signatures.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            PrivateKey::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
            PrivateKey::Ecdsa(key) => {
                let mut digest = [0u8; 32];
                digest.copy_from_slice(&Keccak256::digest(message));
                let secp = secp256k1::Secp256k1::signing_only();
                let msg = secp256k1::Message::from_digest(digest);
                secp.sign_ecdsa(&msg, key).serialize_compact().to_vec()
            }
        }
    }
}
