// Key text decoding
//
// Accepted private key forms (all hex, optional 0x prefix):
// - raw 32-byte scalar (algorithm must come from elsewhere)
// - PKCS#8 DER for ED25519 and ECDSA secp256k1
// - SEC1 DER for ECDSA secp256k1
//
// Error messages never echo the input text.

use super::{KeyAlgorithm, KmsError, SecretBytes};

pub(crate) const PRIVATE_KEY_LEN: usize = 32;

const ED25519_PRIVATE_DER_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

const ECDSA_PRIVATE_DER_PREFIX: [u8; 18] = [
    0x30, 0x30, 0x02, 0x01, 0x00, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x04, 0x22,
    0x04, 0x20,
];

const ECDSA_SEC1_DER_PREFIX: [u8; 7] = [0x30, 0x74, 0x02, 0x01, 0x01, 0x04, 0x20];
const ECDSA_SEC1_CURVE_TAG: [u8; 9] = [0xa0, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a];
const ECDSA_SEC1_DER_LEN: usize = 118;

pub(crate) const ED25519_PUBLIC_DER_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

pub(crate) const ECDSA_PUBLIC_DER_PREFIX: [u8; 14] = [
    0x30, 0x2d, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x22, 0x00,
];

const ECDSA_PUBLIC_DER_UNCOMPRESSED_PREFIX: [u8; 23] = [
    0x30, 0x56, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05, 0x2b,
    0x81, 0x04, 0x00, 0x0a, 0x03, 0x42, 0x00,
];

/// A private scalar pulled out of key text, plus the algorithm its
/// encoding declared (DER only)
pub(crate) struct DecodedPrivateKey {
    pub algorithm: Option<KeyAlgorithm>,
    pub scalar: SecretBytes,
}

/// Decode hex text with an optional 0x prefix
pub(crate) fn decode_hex(text: &str) -> Result<Vec<u8>, KmsError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(KmsError::InvalidKey("key text is empty".into()));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(KmsError::InvalidKey("key text must be hex".into()));
    }
    if digits.len() % 2 != 0 {
        return Err(KmsError::InvalidKey("key text has an odd number of hex digits".into()));
    }

    hex::decode(digits).map_err(|e| KmsError::InvalidKey(e.to_string()))
}

/// Decode private key text into a 32-byte scalar
pub(crate) fn decode_private_key(text: &str) -> Result<DecodedPrivateKey, KmsError> {
    let bytes = SecretBytes::new(decode_hex(text)?);
    let raw = bytes.expose();

    let (algorithm, scalar) = if raw.len() == PRIVATE_KEY_LEN {
        (None, raw)
    } else if raw.len() == ED25519_PRIVATE_DER_PREFIX.len() + PRIVATE_KEY_LEN
        && raw.starts_with(&ED25519_PRIVATE_DER_PREFIX)
    {
        (Some(KeyAlgorithm::Ed25519), &raw[ED25519_PRIVATE_DER_PREFIX.len()..])
    } else if raw.len() == ECDSA_PRIVATE_DER_PREFIX.len() + PRIVATE_KEY_LEN
        && raw.starts_with(&ECDSA_PRIVATE_DER_PREFIX)
    {
        (Some(KeyAlgorithm::Ecdsa), &raw[ECDSA_PRIVATE_DER_PREFIX.len()..])
    } else if raw.len() == ECDSA_SEC1_DER_LEN
        && raw.starts_with(&ECDSA_SEC1_DER_PREFIX)
        && raw[39..48] == ECDSA_SEC1_CURVE_TAG
    {
        (Some(KeyAlgorithm::Ecdsa), &raw[7..39])
    } else {
        return Err(KmsError::InvalidKey(format!(
            "unrecognized private key encoding ({} bytes); expected 32-byte hex or DER",
            raw.len()
        )));
    };

    Ok(DecodedPrivateKey {
        algorithm,
        scalar: SecretBytes::new(scalar.to_vec()),
    })
}

/// Infer the algorithm of private key text from its encoding alone
///
/// Raw 32-byte keys are valid for both schemes and are rejected as ambiguous.
pub fn detect_algorithm(text: &str) -> Result<KeyAlgorithm, KmsError> {
    decode_private_key(text)?
        .algorithm
        .ok_or(KmsError::AmbiguousAlgorithm)
}

/// Decode public key text into canonical raw bytes
/// (32 bytes for ED25519, 33-byte compressed point for ECDSA)
pub(crate) fn decode_public_key(text: &str, algorithm: KeyAlgorithm) -> Result<Vec<u8>, KmsError> {
    let raw = decode_hex(text)?;

    match algorithm {
        KeyAlgorithm::Ed25519 => {
            let key = if raw.len() == 32 {
                raw
            } else if raw.len() == ED25519_PUBLIC_DER_PREFIX.len() + 32
                && raw.starts_with(&ED25519_PUBLIC_DER_PREFIX)
            {
                raw[ED25519_PUBLIC_DER_PREFIX.len()..].to_vec()
            } else {
                return Err(KmsError::InvalidKey(format!(
                    "unrecognized ed25519 public key encoding ({} bytes)",
                    raw.len()
                )));
            };
            let bytes: [u8; 32] = key
                .as_slice()
                .try_into()
                .map_err(|_| KmsError::InvalidKey("ed25519 public key must be 32 bytes".into()))?;
            ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                .map_err(|e| KmsError::InvalidKey(e.to_string()))?;
            Ok(key)
        }
        KeyAlgorithm::Ecdsa => {
            let point = if raw.len() == 33 || raw.len() == 65 {
                &raw[..]
            } else if raw.len() == ECDSA_PUBLIC_DER_PREFIX.len() + 33
                && raw.starts_with(&ECDSA_PUBLIC_DER_PREFIX)
            {
                &raw[ECDSA_PUBLIC_DER_PREFIX.len()..]
            } else if raw.len() == ECDSA_PUBLIC_DER_UNCOMPRESSED_PREFIX.len() + 65
                && raw.starts_with(&ECDSA_PUBLIC_DER_UNCOMPRESSED_PREFIX)
            {
                &raw[ECDSA_PUBLIC_DER_UNCOMPRESSED_PREFIX.len()..]
            } else {
                return Err(KmsError::InvalidKey(format!(
                    "unrecognized ecdsa public key encoding ({} bytes)",
                    raw.len()
                )));
            };
            let key = secp256k1::PublicKey::from_slice(point)
                .map_err(|e| KmsError::InvalidKey(e.to_string()))?;
            Ok(key.serialize().to_vec())
        }
    }
}
