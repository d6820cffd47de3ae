//! `GET /metrics`: JSON snapshot by default, Prometheus text exposition
//! with `?format=prom` (spec §4.9).

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    #[serde(default)]
    pub format: Option<String>,
}

pub async fn metrics(
    State(state): State<SharedState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Response, ApiError> {
    if query.format.as_deref() == Some("prom") {
        let body = state
            .metrics
            .render_prometheus()
            .map_err(|err| ApiError::with_reason(sgn_core::ErrorKind::ServerError, err.to_string()))?;
        return Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response());
    }

    Ok(Json(state.metrics.snapshot_json()).into_response())
}
