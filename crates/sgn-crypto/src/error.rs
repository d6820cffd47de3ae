use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("pkcs8 error: {0}")]
    Pkcs8(String),

    #[error("spki error: {0}")]
    Spki(String),

    #[error("invalid base64 signature: {0}")]
    Base64(String),

    #[error("invalid signature bytes: {0}")]
    Signature(String),

    #[error("sgn-core error: {0}")]
    Core(#[from] sgn_core::Error),
}

/// Outcome of verifying a signed KU (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Ok,
    MissingSig,
    DecodeError,
    KeyIdMismatch,
    PubKeyMismatch,
    BadSignature,
}

impl VerifyOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, VerifyOutcome::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyOutcome::Ok => "ok",
            VerifyOutcome::MissingSig => "missing_sig",
            VerifyOutcome::DecodeError => "decode_error",
            VerifyOutcome::KeyIdMismatch => "key_id_mismatch",
            VerifyOutcome::PubKeyMismatch => "pubkey_mismatch",
            VerifyOutcome::BadSignature => "bad_signature",
        }
    }
}
