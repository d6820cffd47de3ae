//! Ed25519 signing, verification, and key fingerprinting for KUs.

pub mod error;
pub mod fingerprint;
pub mod keypair;
pub mod sign;

pub use error::{Error, Result, VerifyOutcome};
pub use fingerprint::{key_id, key_id_from_pem};
pub use keypair::{verify_raw, verifying_key_from_pem, KeyPair};
pub use sign::{sign_ku, verify_ku, verify_ku_with_pub_pem};
