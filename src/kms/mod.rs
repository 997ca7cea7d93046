// KMS module - private key custody
// Opaque key handles over pluggable storage managers

mod algorithm;
mod cipher;
mod encoding;
mod error;
mod evm;
mod keys;
mod manager;
mod service;

pub use algorithm::KeyAlgorithm;
pub use cipher::{MasterSecret, SALT_LENGTH, SECRET_LENGTH};
pub use encoding::detect_algorithm;
pub use error::KmsError;
pub use evm::evm_address_from_public_key;
pub use keys::{PublicKey, SecretBytes};
pub use manager::{
    EncryptedManager, KeyStorageManager, PlaintextManager, ENCRYPTED_MANAGER, PLAINTEXT_MANAGER,
};
pub use service::{CreatedKey, KeyHandle, KeyRefId, KeyStore};
