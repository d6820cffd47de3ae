//! Ed25519 keypair generation and PEM encoding.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rand::rngs::OsRng;
use spki::{DecodePublicKey, EncodePublicKey};

use crate::error::{Error, Result};

/// An Ed25519 identity: a signing key plus its derived verifying key.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstructs a keypair from a 32-byte seed (deterministic, for tests).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses a keypair from a PKCS#8 PEM-encoded private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let signing_key =
            SigningKey::from_pkcs8_pem(pem).map_err(|e| Error::Pkcs8(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Encodes the private key as a PKCS#8 PEM document.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|z| z.to_string())
            .map_err(|e| Error::Pkcs8(e.to_string()))
    }

    /// Encodes the public key as an SPKI PEM document (spec `pub_pem`).
    pub fn public_key_pem(&self) -> Result<String> {
        self.signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::Spki(e.to_string()))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a message, returning the raw 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Parses an SPKI PEM-encoded public key.
pub fn verifying_key_from_pem(pem: &str) -> Result<VerifyingKey> {
    VerifyingKey::from_public_key_pem(pem).map_err(|e| Error::Spki(e.to_string()))
}

/// Verifies a raw 64-byte Ed25519 signature over `message`.
pub fn verify_raw(key: &VerifyingKey, message: &[u8], signature: &[u8; 64]) -> bool {
    let sig = DalekSignature::from_bytes(signature);
    key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = KeyPair::generate();
        let msg = b"a knowledge unit's canonical bytes";
        let sig = kp.sign(msg);
        assert!(verify_raw(&kp.verifying_key(), msg, &sig));
    }

    #[test]
    fn pem_round_trip_preserves_identity() {
        let kp = KeyPair::generate();
        let pub_pem = kp.public_key_pem().unwrap();
        let recovered = verifying_key_from_pem(&pub_pem).unwrap();
        assert_eq!(recovered, kp.verifying_key());
    }

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [7u8; 32];
        let a = KeyPair::from_seed(&seed);
        let b = KeyPair::from_seed(&seed);
        assert_eq!(a.verifying_key(), b.verifying_key());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(!verify_raw(&kp.verifying_key(), b"tampered", &sig));
    }
}
