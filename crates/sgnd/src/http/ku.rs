//! `GET /ku/:cid`: fetch a stored KU by content ID (spec §4.8).

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use sgn_core::{Ku, Provenance, ErrorKind};

use crate::error::ApiError;
use crate::state::{now_ms, SharedState};

#[derive(Debug, Deserialize)]
pub struct KuQuery {
    #[serde(default)]
    pub view: Option<String>,
}

pub async fn get_ku(
    State(state): State<SharedState>,
    Path(cid): Path<String>,
    Query(_query): Query<KuQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let read_started = Instant::now();
    let retrieved = state.store.retrieve(&cid, now_ms()).await?;
    state.metrics.observe_db_read(read_started.elapsed().as_secs_f64() * 1000.0);
    if let Some(ku) = retrieved {
        return Ok(Json(ku));
    }

    // Blob missing but the index still has a projection row: reconstruct
    // a best-effort KU rather than reporting a false 404.
    if let Some(record) = state.store.get_record(&cid).await? {
        tracing::warn!(cid = %cid, "consistency_mismatch: blob missing, reconstructing from index");
        return Ok(Json(reconstruct_from_record(&record)));
    }

    Err(ApiError::new(ErrorKind::NotFound))
}

fn reconstruct_from_record(record: &sgn_core::KuRecord) -> Ku {
    let payload = json!({
        "title": record.title,
        "description": record.description,
        "solution": record.solution,
        "severity": record.severity,
        "confidence": record.confidence,
        "affected_systems": record.affected_systems,
        "discovered_by": record.discovered_by,
    });

    Ku {
        ku_type: record.ku_type.clone(),
        schema_id: sgn_core::SCHEMA_ID.to_string(),
        content_type: sgn_core::DEFAULT_CONTENT_TYPE.to_string(),
        payload,
        parents: Vec::new(),
        sources: Vec::new(),
        tests: Vec::new(),
        provenance: Provenance::default(),
        tags: record.tags.clone(),
        sig: record.signature.clone(),
    }
}
