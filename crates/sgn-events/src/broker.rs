//! Broadcast fan-out core (spec §4.6). Generalizes the teacher's TCP
//! accept-loop-with-shutdown-broadcast shape: instead of one `()`
//! shutdown signal, every subscriber gets its own filtered view of a
//! shared `broadcast::Sender<EventFrame>`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::frame::EventFrame;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct Broker {
    tx: broadcast::Sender<EventFrame>,
    subscriber_count: Arc<AtomicI64>,
}

/// Drops decrement the broker's live subscriber count; hold this for the
/// lifetime of a connection.
pub struct Subscription {
    rx: broadcast::Receiver<EventFrame>,
    subscriber_count: Arc<AtomicI64>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscriber_count.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<EventFrame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Broker {
            tx,
            subscriber_count: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.subscriber_count.fetch_add(1, Ordering::Relaxed);
        Subscription {
            rx: self.tx.subscribe(),
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    /// Broadcasts `frame` to all current subscribers. Returns the number
    /// of subscribers it was delivered to (0 if none are connected).
    pub fn publish(&self, frame: EventFrame) -> usize {
        self.tx.send(frame).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> i64 {
        self.subscriber_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_frame() {
        let broker = Broker::new();
        let mut sub = broker.subscribe();
        broker.publish(EventFrame::Health {
            status: "ok".into(),
            outbox_ready: 0,
            ts_ms: 1,
        });
        let frame = sub.recv().await.unwrap();
        assert_eq!(frame.kind(), "health");
    }

    #[tokio::test]
    async fn subscriber_count_tracks_active_subscriptions() {
        let broker = Broker::new();
        assert_eq!(broker.subscriber_count(), 0);
        let sub = broker.subscribe();
        assert_eq!(broker.subscriber_count(), 1);
        drop(sub);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let broker = Broker::new();
        assert_eq!(
            broker.publish(EventFrame::Edge {
                src: "a".into(),
                dst: "b".into(),
                edge_type: "verifies".into(),
            }),
            0
        );
    }
}
