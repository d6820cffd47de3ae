//! Thin HTTP/JSON handlers orchestrating C1-C7 behind shared
//! `DaemonState` (spec §4.8). Wiring follows the pack's
//! `Router::new().route(...).with_state(...)` + layered middleware shape.

pub mod admin;
pub mod edges;
pub mod events;
pub mod graph;
pub mod health;
pub mod ku;
pub mod metrics;
pub mod publish;
pub mod trust;
pub mod verify;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/live", get(health::live))
        .route("/ready", get(health::ready))
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        .route("/publish", post(publish::publish))
        .route("/verify", post(verify::verify))
        .route("/ku/:cid", get(ku::get_ku))
        .route("/edges", post(edges::create_edge))
        .route("/edges/:cid", get(edges::list_edges))
        .route("/graph/:cid", get(graph::get_graph))
        .route("/trust/reload", post(trust::reload))
        .route("/admin/consistency", get(admin::consistency))
        .route("/admin/drain", post(admin::drain))
        .route("/metrics", get(metrics::metrics))
        .route("/events", get(events::events))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
