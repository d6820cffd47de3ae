//! `DaemonState`: the single root value owning every store, lifted up
//! from global singletons per spec §9's redesign note.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sgn_edges::EdgeStore;
use sgn_events::Broker;
use sgn_metrics::Metrics;
use sgn_outbox::OutboxStore;
use sgn_storage::ObjectStore;
use sgn_trust::TrustPolicy;

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub store: ObjectStore,
    pub outbox: OutboxStore,
    pub edges: EdgeStore,
    pub trust: Arc<TrustPolicy>,
    pub broker: Broker,
    pub metrics: Arc<Metrics>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub async fn open(config: Config) -> anyhow::Result<SharedState> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let db_url = format!("sqlite://{}?mode=rwc", config.db_path().display());
        let outbox_url = format!("sqlite://{}?mode=rwc", config.outbox_db_path().display());
        let edges_url = format!("sqlite://{}?mode=rwc", config.edges_db_path().display());

        let store = ObjectStore::open(config.kus_dir(), &db_url).await?;
        let outbox = OutboxStore::open(&outbox_url).await?;
        let edges = EdgeStore::open(&edges_url).await?;
        let trust = Arc::new(TrustPolicy::load(config.trust_path())?);
        let broker = Broker::new();
        let metrics = Arc::new(Metrics::new()?);

        Ok(Arc::new(AppState {
            config,
            store,
            outbox,
            edges,
            trust,
            broker,
            metrics,
        }))
    }
}

/// Milliseconds since the Unix epoch, for timestamps persisted to the
/// stores. Not called from workflow/test-synchronized code paths.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
