//! Background delivery loop: poll due entries, hand each to a sender,
//! record the outcome. Same `tokio::select!` ticker-with-shutdown shape
//! as the teacher's sync task.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use sgn_metrics::Metrics;

use crate::store::{OutboxStore, MAX_ATTEMPTS};

/// Delivers one outbox entry; `Ok` marks it sent, `Err` applies backoff.
pub type Sender = Box<
    dyn Fn(&crate::store::OutboxEntry) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>>
        + Send
        + Sync,
>;

pub struct Scheduler {
    store: OutboxStore,
    poll_interval: Duration,
    batch_size: i64,
    metrics: Arc<Metrics>,
}

impl Scheduler {
    pub fn new(store: OutboxStore, poll_interval: Duration, batch_size: i64, metrics: Arc<Metrics>) -> Self {
        Scheduler {
            store,
            poll_interval,
            batch_size,
            metrics,
        }
    }

    /// Runs one poll cycle: claim due entries, deliver each, record the
    /// outcome. Returns the number of entries processed.
    pub async fn run_once(&self, now_ms: i64, send: &Sender) -> crate::error::Result<usize> {
        let due = self.store.due_entries(now_ms, self.batch_size).await?;
        let count = due.len();
        for entry in due {
            match send(&entry).await {
                Ok(()) => {
                    self.store.mark_sent(entry.seq).await?;
                    self.metrics.record_outbox_delivery();
                    tracing::debug!(seq = entry.seq, target = %entry.target, "outbox entry delivered");
                }
                Err(err) => {
                    let status = self.store.mark_failed(entry.seq, now_ms, &err).await?;
                    self.metrics.record_outbox_retry();
                    if matches!(status, crate::store::OutboxStatus::Dead) {
                        self.metrics.record_outbox_stalled();
                        tracing::warn!(
                            seq = entry.seq,
                            target = %entry.target,
                            attempts = MAX_ATTEMPTS,
                            "outbox entry exhausted retries"
                        );
                    }
                }
            }
        }
        Ok(count)
    }

    /// Runs the poll loop until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>, send: Sender, now_fn: impl Fn() -> i64) {
        let mut ticker = interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(now_fn(), &send).await {
                        tracing::error!(error = %e, "outbox poll cycle failed");
                    }
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }
    }

    pub fn store(&self) -> &OutboxStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn open_store() -> (tempfile::TempDir, OutboxStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("outbox.db").display());
        let store = OutboxStore::open(&url).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn run_once_delivers_due_entries() {
        let (_dir, store) = open_store().await;
        store
            .enqueue("ku_announce", "peer-1", &serde_json::json!({}), 1000)
            .await
            .unwrap();

        let scheduler = Scheduler::new(store, Duration::from_secs(1), 10, Arc::new(Metrics::new().unwrap()));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let send: Sender = Box::new(move |_entry| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        let processed = scheduler.run_once(2000, &send).await.unwrap();
        assert_eq!(processed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counts = scheduler.store().counts().await.unwrap();
        assert_eq!(counts.sent, 1);
        assert_eq!(counts.pending, 0);
    }

    #[tokio::test]
    async fn run_once_backs_off_on_failure() {
        let (_dir, store) = open_store().await;
        store
            .enqueue("ku_announce", "peer-1", &serde_json::json!({}), 1000)
            .await
            .unwrap();

        let scheduler = Scheduler::new(store, Duration::from_secs(1), 10, Arc::new(Metrics::new().unwrap()));
        let send: Sender =
            Box::new(|_entry| Box::pin(async { Err("unreachable".to_string()) }));

        scheduler.run_once(2000, &send).await.unwrap();
        let counts = scheduler.store().counts().await.unwrap();
        assert_eq!(counts.pending, 1);

        // Not due immediately after backoff is applied.
        let due = scheduler.store().due_entries(2000, 10).await.unwrap();
        assert!(due.is_empty());
    }
}
