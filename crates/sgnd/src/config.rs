//! Daemon configuration: CLI flags with environment variable bindings
//! (spec §6).

use std::path::PathBuf;

use clap::Parser;

/// sgnd - SGN node daemon
#[derive(Parser, Debug, Clone)]
#[command(name = "sgnd")]
#[command(about = "Knowledge Unit distribution node daemon")]
pub struct Config {
    /// HTTP listen port.
    #[arg(long, env = "SGN_HTTP_PORT", default_value = "8787")]
    pub http_port: u16,

    /// Data directory; individual store paths default relative to this.
    #[arg(long, env = "SGN_DATA_DIR", default_value = "./data/sgn")]
    pub data_dir: PathBuf,

    /// Index store database path. Defaults to `<data_dir>/sgn.db`.
    #[arg(long, env = "SGN_DB")]
    pub db: Option<PathBuf>,

    /// Raw KU blob directory. Defaults to `<data_dir>/kus`.
    #[arg(long, env = "SGN_KUS_DIR")]
    pub kus_dir: Option<PathBuf>,

    /// JSONL audit log directory. Defaults to `<data_dir>/logs`.
    #[arg(long, env = "SGN_LOGS_DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Trust config path. Defaults to `<data_dir>/trust.json`.
    #[arg(long, env = "SGN_TRUST_PATH")]
    pub trust_path: Option<PathBuf>,

    /// Edge store database path. Defaults to `<data_dir>/sgn-edges.db`.
    #[arg(long, env = "SGN_EDGES_DB")]
    pub edges_db: Option<PathBuf>,

    /// Outbox store database path. Defaults to `<data_dir>/sgn-outbox.db`.
    #[arg(long, env = "SGN_OUTBOX_DB")]
    pub outbox_db: Option<PathBuf>,

    /// Set to "off" to disable outbox enqueue on publish (spec §6).
    #[arg(long, env = "SGN_BROADCAST", default_value = "on")]
    pub broadcast: String,

    /// Allowed WebSocket Origin header value. Unset accepts any origin.
    #[arg(long, env = "SGN_EVENTS_ORIGIN")]
    pub events_origin: Option<String>,

    /// Required bearer token for `/events`. Unset accepts unauthenticated
    /// connections.
    #[arg(long, env = "SGN_EVENTS_BEARER")]
    pub events_bearer: Option<String>,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| self.data_dir.join("sgn.db"))
    }

    pub fn kus_dir(&self) -> PathBuf {
        self.kus_dir.clone().unwrap_or_else(|| self.data_dir.join("kus"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.logs_dir.clone().unwrap_or_else(|| self.data_dir.join("logs"))
    }

    pub fn trust_path(&self) -> PathBuf {
        self.trust_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("trust.json"))
    }

    pub fn edges_db_path(&self) -> PathBuf {
        self.edges_db
            .clone()
            .unwrap_or_else(|| self.data_dir.join("sgn-edges.db"))
    }

    pub fn outbox_db_path(&self) -> PathBuf {
        self.outbox_db
            .clone()
            .unwrap_or_else(|| self.data_dir.join("sgn-outbox.db"))
    }

    pub fn broadcast_enabled(&self) -> bool {
        self.broadcast.to_lowercase() != "off"
    }

    /// Rejects an unusable configuration before any socket or file is
    /// opened, mirroring `gossipd::config::Config::validate`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http_port == 0 {
            anyhow::bail!("http_port must be nonzero");
        }
        if self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("data_dir cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_off_is_case_insensitive() {
        let mut config = Config::try_parse_from(["sgnd"]).unwrap();
        config.broadcast = "OFF".into();
        assert!(!config.broadcast_enabled());
    }

    #[test]
    fn default_paths_derive_from_data_dir() {
        let config = Config::try_parse_from(["sgnd", "--data-dir", "/tmp/sgn-test"]).unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/tmp/sgn-test/sgn.db"));
        assert_eq!(config.kus_dir(), PathBuf::from("/tmp/sgn-test/kus"));
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = Config::try_parse_from(["sgnd"]).unwrap();
        config.http_port = 0;
        assert!(config.validate().is_err());
    }
}
