//! Error types and the stable error-kind taxonomy shared across the daemon.

use thiserror::Error;

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// sgn-core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON encode/decode failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required KU field was missing or malformed.
    #[error("missing or malformed field: {0}")]
    MissingField(String),
}

/// Stable error-kind strings returned in HTTP error responses (spec §7).
///
/// Every fallible boundary in the daemon converts its internal error into
/// one of these before it crosses the HTTP layer; no exception type or
/// internal message ever leaks past this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidKu,
    VerifyFailed,
    UntrustedKey,
    NotFound,
    InvalidType,
    MissingCid,
    BadRequest,
    RateLimited,
    ServerError,
}

impl ErrorKind {
    /// The exact wire string for this error kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidKu => "invalid_ku",
            ErrorKind::VerifyFailed => "verify_failed",
            ErrorKind::UntrustedKey => "untrusted_key",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::MissingCid => "missing_cid",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServerError => "server_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
