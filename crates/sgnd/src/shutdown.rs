//! Shutdown fan-out for the daemon's background tasks (outbox scheduler,
//! health broadcaster, idle reaper), generalizing `gossipd::server`'s
//! single shutdown broadcast to several independent subscribers.

use tokio::sync::broadcast;

#[derive(Clone)]
pub struct ShutdownScope {
    tx: broadcast::Sender<()>,
}

impl ShutdownScope {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(1);
        ShutdownScope { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcasts shutdown to every live subscriber. Safe to call with
    /// zero subscribers.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for ShutdownScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_trigger() {
        let scope = ShutdownScope::new();
        let mut a = scope.subscribe();
        let mut b = scope.subscribe();
        scope.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn trigger_with_no_subscribers_does_not_panic() {
        let scope = ShutdownScope::new();
        scope.trigger();
    }
}
