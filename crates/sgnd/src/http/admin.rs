//! `GET /admin/consistency`, `POST /admin/drain` (spec §4.9, §4.8).

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::state::{now_ms, SharedState};

pub async fn consistency(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.store.consistency_report().await?;
    let mismatches = report.missing_blobs.len() + report.orphan_blobs.len();
    state.metrics.set_outbox_ready(state.outbox.counts().await?.pending);
    state.metrics.set_fs_kus_count(report.blob_count as i64);
    state.metrics.set_consistency_mismatches(mismatches as i64);

    Ok(Json(json!({
        "db_only": report.missing_blobs,
        "fs_only": report.orphan_blobs,
        "mismatches": mismatches,
        "total_db": report.index_count,
        "total_fs": report.blob_count,
        "consistent": report.is_consistent(),
    })))
}

/// Walks the outbox's ready queue and marks each entry sent. Used only
/// to flush a single-node environment (spec §4.8) — does not perform
/// any actual delivery.
pub async fn drain(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let due = state.outbox.due_entries(now_ms(), i64::MAX).await?;
    for entry in &due {
        state.outbox.mark_sent(entry.seq).await?;
    }

    Ok(Json(json!({
        "drained": due.len(),
        "broadcast_enabled": state.config.broadcast_enabled(),
    })))
}
