//! Drives one subscriber's WebSocket connection: broadcast frames
//! (rate-limited by its token bucket), periodic pings, idle eviction,
//! client ack accounting (spec §4.6).

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};

use sgn_metrics::Metrics;

use crate::broker::Broker;
use crate::frame::{AckMessage, EventFrame};
use crate::token_bucket::TokenBucket;

pub const PING_INTERVAL: Duration = Duration::from_secs(30);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// How many distinct KU CIDs a subscriber remembers for dedup purposes.
/// The outbox's at-least-once delivery (spec §4.5) means the same CID may
/// be broadcast twice; this bounds the redelivery window rather than the
/// connection's full lifetime.
const DEDUP_WINDOW: usize = 256;

/// Drives `socket` until the client disconnects, the broker closes, or
/// the connection goes idle for [`IDLE_TIMEOUT`].
pub async fn serve_subscriber(socket: WebSocket, broker: Broker, metrics: Arc<Metrics>) {
    serve_subscriber_with_bucket(socket, broker, TokenBucket::with_defaults(), metrics).await
}

pub async fn serve_subscriber_with_bucket(
    socket: WebSocket,
    broker: Broker,
    mut bucket: TokenBucket,
    metrics: Arc<Metrics>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = broker.subscribe();
    let mut ping_ticker = tokio::time::interval(PING_INTERVAL);
    let mut last_activity = Instant::now();
    let mut dedup = CidDedup::new();

    loop {
        tokio::select! {
            frame = subscription.recv() => {
                match frame {
                    Some(frame) => {
                        if !forward_frame(&mut sender, &frame, &mut bucket, &mut dedup, &metrics).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ping_ticker.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        last_activity = Instant::now();
                        handle_incoming(&message, &metrics);
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }

        if last_activity.elapsed() > IDLE_TIMEOUT {
            tracing::info!("evicting idle websocket subscriber");
            break;
        }
    }
}

/// Parses a client text frame as `{type:"ack"|"KU_ACK", cid}` and
/// records the acknowledgement. Any other frame is just an activity
/// signal (already applied by the caller).
fn handle_incoming(message: &Message, metrics: &Metrics) {
    let Message::Text(text) = message else { return };
    let Ok(ack) = serde_json::from_str::<AckMessage>(text) else { return };
    if ack.is_ack() {
        metrics.record_net_acked();
        tracing::info!(evt = "ku_acked", cid = ?ack.cid, "subscriber acked event");
    }
}

/// Sends `frame` if the token bucket allows it. Returns `false` if the
/// send failed and the connection should be torn down; a dropped frame
/// due to backpressure or subscriber-side dedup returns `true` (the
/// connection stays open).
async fn forward_frame(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &EventFrame,
    bucket: &mut TokenBucket,
    dedup: &mut CidDedup,
    metrics: &Metrics,
) -> bool {
    if let EventFrame::Ku { cid, .. } = frame {
        if !dedup.insert(cid) {
            metrics.record_net_dedup();
            return true;
        }
    }

    if !bucket.try_consume() {
        let reason = if matches!(frame, EventFrame::Health { .. }) {
            "health_backpressure"
        } else {
            "backpressure"
        };
        tracing::debug!(kind = frame.kind(), "dropping event frame: subscriber backpressure");
        metrics.record_events_drop(reason);
        return true;
    }

    let Ok(payload) = serde_json::to_string(frame) else {
        return true;
    };
    let sent = sender.send(Message::Text(payload)).await.is_ok();
    if sent {
        metrics.record_net_delivered();
    }
    sent
}

/// Tracks recently delivered KU CIDs for a single subscriber, bounded to
/// [`DEDUP_WINDOW`] entries (oldest evicted first).
struct CidDedup {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl CidDedup {
    fn new() -> Self {
        CidDedup {
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns `true` the first time `cid` is seen, `false` on repeats.
    fn insert(&mut self, cid: &str) -> bool {
        if !self.seen.insert(cid.to_string()) {
            return false;
        }
        self.order.push_back(cid.to_string());
        if self.order.len() > DEDUP_WINDOW {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_rejects_repeat_cid_within_window() {
        let mut dedup = CidDedup::new();
        assert!(dedup.insert("cid-a"));
        assert!(!dedup.insert("cid-a"));
        assert!(dedup.insert("cid-b"));
    }

    #[test]
    fn dedup_evicts_oldest_past_window() {
        let mut dedup = CidDedup::new();
        for i in 0..DEDUP_WINDOW {
            assert!(dedup.insert(&format!("cid-{i}")));
        }
        // cid-0 has aged out, so it is accepted again.
        assert!(dedup.insert("cid-0"));
    }
}
