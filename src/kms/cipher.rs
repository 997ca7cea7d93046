//! At-rest encryption for key material.
//!
//! Material is sealed with AES-256-GCM under a locally-held 32-byte master
//! secret. The sealed format is `[nonce (12 bytes)][ciphertext + tag]`, and
//! the key reference id is bound as associated data so sealed blobs cannot be
//! swapped between handles.

use super::{KmsError, SecretBytes};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use rand::RngCore;
use std::fs;
use std::io::Write;
use std::path::Path;
use zeroize::Zeroizing;

/// The length of the nonce used for AES-GCM encryption.
const NONCE_LENGTH: usize = 12;

/// The length of the master secret.
pub const SECRET_LENGTH: usize = 32;

/// The length of the salt used for passphrase derivation.
pub const SALT_LENGTH: usize = 16;

/// Symmetric secret used by the encrypted storage manager, wiped on drop
pub struct MasterSecret(Zeroizing<[u8; SECRET_LENGTH]>);

impl MasterSecret {
    /// Generate a fresh random secret
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; SECRET_LENGTH]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SECRET_LENGTH]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Derive a secret from a passphrase and salt using Argon2id.
    pub fn from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, KmsError> {
        if salt.len() != SALT_LENGTH {
            return Err(KmsError::Cipher(format!(
                "salt must be {} bytes, got {}",
                SALT_LENGTH,
                salt.len()
            )));
        }

        let mut output = Zeroizing::new([0u8; SECRET_LENGTH]);
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt, &mut output[..])
            .map_err(|e| KmsError::Cipher(format!("argon2: {}", e)))?;
        Ok(Self(output))
    }

    /// Load the hex-encoded secret at `path`, creating it (mode 0600 on
    /// unix) when it does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, KmsError> {
        let path = path.as_ref();
        if path.exists() {
            let text = Zeroizing::new(
                fs::read_to_string(path).map_err(|e| KmsError::Io(e.to_string()))?,
            );
            let mut bytes = Zeroizing::new([0u8; SECRET_LENGTH]);
            hex::decode_to_slice(text.trim(), &mut bytes[..])
                .map_err(|_| KmsError::Cipher(format!("{} is not a valid secret file", path.display())))?;
            return Ok(Self(bytes));
        }

        let secret = Self::generate();
        let encoded = Zeroizing::new(hex::encode(&secret.0[..]));
        write_private_file(path, encoded.as_bytes())?;
        tracing::info!(path = %path.display(), "created key store secret");
        Ok(secret)
    }

    /// Load the salt at `path` and derive the secret from `passphrase`,
    /// creating a random salt on first use.
    pub fn from_passphrase_file<P: AsRef<Path>>(passphrase: &str, salt_path: P) -> Result<Self, KmsError> {
        let path = salt_path.as_ref();
        let salt = if path.exists() {
            let text = fs::read_to_string(path).map_err(|e| KmsError::Io(e.to_string()))?;
            hex::decode(text.trim())
                .map_err(|_| KmsError::Cipher(format!("{} is not a valid salt file", path.display())))?
        } else {
            let mut salt = vec![0u8; SALT_LENGTH];
            rand::thread_rng().fill_bytes(&mut salt);
            write_private_file(path, hex::encode(&salt).as_bytes())?;
            salt
        };
        Self::from_passphrase(passphrase, &salt)
    }

    /// Encrypt `plaintext`, binding `aad` to the ciphertext
    pub(crate) fn seal(&self, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let cipher = Aes256Gcm::new_from_slice(&self.0[..])
            .map_err(|e| KmsError::Cipher(format!("invalid key length: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: plaintext, aad })
            .map_err(|e| KmsError::Cipher(format!("encryption failed: {}", e)))?;

        let mut output = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt a blob produced by [`MasterSecret::seal`] with the same `aad`
    pub(crate) fn open(&self, aad: &[u8], sealed: &[u8]) -> Result<SecretBytes, KmsError> {
        if sealed.len() < NONCE_LENGTH {
            return Err(KmsError::Cipher(format!(
                "sealed data too short: expected at least {} bytes, got {}",
                NONCE_LENGTH,
                sealed.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.0[..])
            .map_err(|e| KmsError::Cipher(format!("invalid key length: {}", e)))?;
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), Payload { msg: ciphertext, aad })
            .map_err(|_| KmsError::Cipher("wrong secret or corrupted data".into()))?;
        Ok(SecretBytes::new(plaintext))
    }
}

fn write_private_file(path: &Path, contents: &[u8]) -> Result<(), KmsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| KmsError::Io(e.to_string()))?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| KmsError::Io(e.to_string()))?;
    file.write_all(contents).map_err(|e| KmsError::Io(e.to_string()))?;
    file.sync_all().map_err(|e| KmsError::Io(e.to_string()))?;
    Ok(())
}
