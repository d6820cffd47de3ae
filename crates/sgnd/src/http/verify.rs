//! `POST /verify`: the pure verification path, no side effects besides
//! metrics (spec §4.8).

use std::time::Instant;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use sgn_core::Ku;

use crate::error::ApiError;
use crate::state::SharedState;
use crate::verify_logic::evaluate;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub ku: Ku,
    #[serde(default)]
    pub pub_pem: Option<String>,
}

pub async fn verify(
    State(state): State<SharedState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let outcome = evaluate(&req.ku, &state.trust, req.pub_pem.as_deref());
    state.metrics.observe_http_verify(started.elapsed().as_secs_f64() * 1000.0);

    if !outcome.ok {
        state
            .metrics
            .record_verify_failure(outcome.reason.as_deref().unwrap_or("unknown"));
    }

    Ok(Json(json!({
        "ok": outcome.ok,
        "trusted": outcome.trusted,
        "reason": outcome.reason,
        "trust_reason": outcome.trust_reason,
    })))
}
