//! On-disk shape of the trust policy (spec §4.3).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the daemon reacts to a KU signed by a key not on the allow list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// Accept the KU but mark it untrusted; publish/list responses flag it.
    Warn,
    /// Reject the KU with `untrusted_key`.
    Enforce,
}

impl TrustMode {
    pub fn parse(s: &str) -> Result<TrustMode> {
        match s {
            "warn" => Ok(TrustMode::Warn),
            "enforce" => Ok(TrustMode::Enforce),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

/// Raw JSON shape loaded from disk: `{"mode": "...", "allow": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    pub mode: TrustMode,
    #[serde(default)]
    pub allow: HashSet<String>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        TrustConfig {
            mode: TrustMode::Warn,
            allow: HashSet::new(),
        }
    }
}

impl TrustConfig {
    pub fn is_allowed(&self, key_id: &str) -> bool {
        self.allow.contains(key_id)
    }
}
