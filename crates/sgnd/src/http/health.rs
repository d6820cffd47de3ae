//! Liveness/readiness/health probes and the version endpoint (spec §6).

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::{now_ms, SharedState};

pub async fn live() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn ready(State(state): State<SharedState>) -> impl IntoResponse {
    let read_start = Instant::now();
    let ku_count = state.store.count().await;
    let db_read_ms = read_start.elapsed().as_secs_f64() * 1000.0;

    let write_start = Instant::now();
    let outbox_counts = state.outbox.counts().await;
    let db_write_ms = write_start.elapsed().as_secs_f64() * 1000.0;

    let (ku_count, outbox_counts) = match (ku_count, outbox_counts) {
        (Ok(k), Ok(o)) => (k, o),
        _ => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"ok": false, "sqlite": "unavailable"})),
            );
        }
    };
    let _ = ku_count;

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "sqlite": "open",
            "db_read_ms": db_read_ms,
            "db_write_ms": db_write_ms,
            "ws_clients": state.broker.subscriber_count(),
            "queue_len": outbox_counts.pending,
        })),
    )
}

pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let read_start = Instant::now();
    let ku_count = state.store.count().await.unwrap_or(0);
    let db_read_ms = read_start.elapsed().as_secs_f64() * 1000.0;

    let write_start = Instant::now();
    let outbox_counts = state.outbox.counts().await.unwrap_or_default();
    let db_write_ms = write_start.elapsed().as_secs_f64() * 1000.0;

    Json(json!({
        "status": "healthy",
        "ok": true,
        "ku_count": ku_count,
        "outbox_ready": outbox_counts.pending,
        "time_ms": now_ms(),
        "db_read_ms": db_read_ms,
        "db_write_ms": db_write_ms,
        "ws_clients": state.broker.subscriber_count(),
        "queue_len": outbox_counts.pending,
    }))
}

pub async fn version() -> impl IntoResponse {
    Json(json!({
        "name": "sgnd",
        "version": env!("CARGO_PKG_VERSION"),
        "schema_id": sgn_core::SCHEMA_ID,
    }))
}
