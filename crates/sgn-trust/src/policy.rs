//! Hot-reloadable trust policy (spec §4.3).
//!
//! Generalized from `gossipd`'s membership gate: that manager mutates one
//! `RwLock<HashMap<PeerId, Member>>` entry at a time, but the daemon needs
//! to swap an *entire* allow list and mode atomically — a reader must
//! never observe a half-applied reload. A `RwLock<Arc<TrustConfig>>`
//! gives every reader a consistent snapshot: `current()` clones the Arc
//! under a brief read lock, and `reload` replaces it under a brief write
//! lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::TrustConfig;
use crate::error::{Error, Result};

/// The outcome of evaluating a key against the current policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Key is on the allow list.
    Trusted,
    /// Key is unknown, but mode is `warn`: accept and flag.
    UntrustedWarn,
    /// Key is unknown and mode is `enforce`: reject.
    UntrustedDenied,
}

impl TrustDecision {
    pub fn is_accepted(self) -> bool {
        !matches!(self, TrustDecision::UntrustedDenied)
    }

    pub fn is_trusted(self) -> bool {
        matches!(self, TrustDecision::Trusted)
    }
}

/// Loads and hot-reloads a [`TrustConfig`] from a JSON file.
pub struct TrustPolicy {
    path: PathBuf,
    current: RwLock<Arc<TrustConfig>>,
}

impl TrustPolicy {
    /// Loads the policy from `path`. Missing file is not an error: the
    /// daemon starts with an empty allow list in `warn` mode.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Self::read(&path)?.unwrap_or_default();
        Ok(TrustPolicy {
            path,
            current: RwLock::new(Arc::new(config)),
        })
    }

    fn read(path: &Path) -> Result<Option<TrustConfig>> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let config: TrustConfig =
                    serde_json::from_str(&text).map_err(|source| Error::Parse {
                        path: path.display().to_string(),
                        source,
                    })?;
                Ok(Some(config))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Re-reads the config file and atomically swaps it in. On error, the
    /// previously loaded config remains in effect.
    pub fn reload(&self) -> Result<()> {
        let config = Self::read(&self.path)?.unwrap_or_default();
        *self.current.write() = Arc::new(config);
        tracing::info!(path = %self.path.display(), "trust policy reloaded");
        Ok(())
    }

    /// Returns a consistent snapshot of the current config.
    pub fn current(&self) -> Arc<TrustConfig> {
        self.current.read().clone()
    }

    /// Evaluates `key_id` against the current snapshot.
    pub fn decide(&self, key_id: &str) -> TrustDecision {
        let config = self.current();
        if config.is_allowed(key_id) {
            return TrustDecision::Trusted;
        }
        match config.mode {
            crate::config::TrustMode::Warn => TrustDecision::UntrustedWarn,
            crate::config::TrustMode::Enforce => TrustDecision::UntrustedDenied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("trust.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_file_defaults_to_warn_empty_allow() {
        let dir = tempfile::tempdir().unwrap();
        let policy = TrustPolicy::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(policy.decide("anykey"), TrustDecision::UntrustedWarn);
    }

    #[test]
    fn enforce_mode_denies_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"mode":"enforce","allow":["k1"]}"#);
        let policy = TrustPolicy::load(&path).unwrap();
        assert_eq!(policy.decide("k1"), TrustDecision::Trusted);
        assert_eq!(policy.decide("k2"), TrustDecision::UntrustedDenied);
    }

    #[test]
    fn reload_picks_up_new_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"mode":"enforce","allow":[]}"#);
        let policy = TrustPolicy::load(&path).unwrap();
        assert_eq!(policy.decide("k1"), TrustDecision::UntrustedDenied);

        write_config(&dir, r#"{"mode":"enforce","allow":["k1"]}"#);
        policy.reload().unwrap();
        assert_eq!(policy.decide("k1"), TrustDecision::Trusted);
    }

    #[test]
    fn reload_with_bad_json_keeps_previous_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"mode":"enforce","allow":["k1"]}"#);
        let policy = TrustPolicy::load(&path).unwrap();

        write_config(&dir, "not json");
        assert!(policy.reload().is_err());
        assert_eq!(policy.decide("k1"), TrustDecision::Trusted);
    }
}
