//! Wire frames broadcast over `/events` (spec §4.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventFrame {
    Ku {
        cid: String,
        ku_type: String,
        trusted: bool,
    },
    Edge {
        src: String,
        dst: String,
        edge_type: String,
    },
    Health {
        status: String,
        outbox_ready: i64,
        ts_ms: i64,
    },
}

impl EventFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            EventFrame::Ku { .. } => "ku",
            EventFrame::Edge { .. } => "edge",
            EventFrame::Health { .. } => "health",
        }
    }
}

/// Client-to-server acknowledgement: `{type:"ack"|"KU_ACK", cid}` (spec §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub cid: Option<String>,
}

impl AckMessage {
    pub fn is_ack(&self) -> bool {
        self.kind.eq_ignore_ascii_case("ack") || self.kind == "KU_ACK"
    }
}
