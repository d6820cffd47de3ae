//! Durable at-least-once delivery queue for outgoing KU announcements.

pub mod error;
pub mod scheduler;
pub mod store;

pub use error::{Error, Result};
pub use scheduler::{Scheduler, Sender};
pub use store::{OutboxCounts, OutboxEntry, OutboxStatus, OutboxStore, BACKOFF_LADDER_SECS, MAX_ATTEMPTS};
