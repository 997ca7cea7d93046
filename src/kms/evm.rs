// EVM address derivation for ECDSA (secp256k1) keys
//
// address = last 20 bytes of keccak256(X || Y), where X || Y is the
// uncompressed public point without its 0x04 tag byte

use super::{KeyAlgorithm, KmsError, PublicKey};
use crate::types::EvmAddress;
use sha3::{Digest, Keccak256};

pub fn evm_address_from_public_key(public_key: &PublicKey) -> Result<EvmAddress, KmsError> {
    if public_key.algorithm() != KeyAlgorithm::Ecdsa {
        return Err(KmsError::EvmUnsupported(public_key.algorithm()));
    }

    let point = secp256k1::PublicKey::from_slice(public_key.as_bytes())
        .map_err(|e| KmsError::InvalidKey(e.to_string()))?;
    let uncompressed = point.serialize_uncompressed();

    let hash = Keccak256::digest(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(EvmAddress::from_bytes(address))
}
