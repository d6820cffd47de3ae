//! WebSocket event broker with per-subscriber backpressure.

pub mod broker;
pub mod frame;
pub mod token_bucket;
pub mod ws;

pub use broker::{Broker, Subscription};
pub use frame::{AckMessage, EventFrame};
pub use token_bucket::TokenBucket;
pub use ws::{serve_subscriber, serve_subscriber_with_bucket, IDLE_TIMEOUT, PING_INTERVAL};
