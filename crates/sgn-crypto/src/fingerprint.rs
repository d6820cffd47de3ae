//! Public-key fingerprinting: `key_id = base32(multihash(sha2-256(SPKI DER)))` (spec §4.2).

use data_encoding::BASE32_NOPAD;
use ed25519_dalek::VerifyingKey;
use multihash::Multihash;
use sha2::{Digest, Sha256};
use spki::EncodePublicKey;

use crate::error::{Error, Result};

/// Multicodec code for sha2-256, per the multihash spec.
const SHA2_256_CODE: u64 = 0x12;

/// Derives the stable `key_id` for a verifying key: the SHA-256 digest of
/// its SPKI DER encoding, wrapped in a multihash (type+length prefix)
/// before base32 encoding.
pub fn key_id(key: &VerifyingKey) -> Result<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| Error::Spki(e.to_string()))?;
    let digest = Sha256::digest(der.as_bytes());
    let hash = Multihash::<32>::wrap(SHA2_256_CODE, &digest)
        .expect("sha2-256 digest is 32 bytes, within the 32-byte multihash buffer");
    Ok(BASE32_NOPAD.encode(&hash.to_bytes()))
}

/// Derives the `key_id` directly from an SPKI PEM string.
pub fn key_id_from_pem(pem: &str) -> Result<String> {
    let key = crate::keypair::verifying_key_from_pem(pem)?;
    key_id(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn key_id_is_deterministic() {
        let kp = KeyPair::from_seed(&[3u8; 32]);
        let a = key_id(&kp.verifying_key()).unwrap();
        let b = key_id(&kp.verifying_key()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_keys_yield_distinct_ids() {
        let a = KeyPair::from_seed(&[1u8; 32]);
        let b = KeyPair::from_seed(&[2u8; 32]);
        assert_ne!(
            key_id(&a.verifying_key()).unwrap(),
            key_id(&b.verifying_key()).unwrap()
        );
    }

    #[test]
    fn key_id_from_pem_matches_direct_derivation() {
        let kp = KeyPair::from_seed(&[9u8; 32]);
        let pem = kp.public_key_pem().unwrap();
        assert_eq!(
            key_id_from_pem(&pem).unwrap(),
            key_id(&kp.verifying_key()).unwrap()
        );
    }
}
