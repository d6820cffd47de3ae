//! `POST /publish`: the durable publish pipeline (spec §4.8).
//!
//! `received → canonical_encode → cid → (optional verify+trust_gate) →
//! object_store.store → outbox.enqueue → broker.notify`.

use std::time::Instant;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use sgn_core::{cid as compute_cid, ErrorKind, Ku};
use sgn_events::EventFrame;

use crate::error::ApiError;
use crate::state::{now_ms, SharedState};
use crate::verify_logic::{enforce_rejection, evaluate};

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub ku: Ku,
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub pub_pem: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyInfo {
    ok: bool,
    trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub async fn publish(
    State(state): State<SharedState>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let _ = compute_cid(&req.ku).map_err(|_| ApiError::new(ErrorKind::InvalidKu))?;

    let verify_info = if req.verify {
        let outcome = evaluate(&req.ku, &state.trust, req.pub_pem.as_deref());
        if let Some(kind) = enforce_rejection(&outcome, &state.trust) {
            state.metrics.record_verify_failure(
                outcome.reason.as_deref().or(outcome.trust_reason.as_deref()).unwrap_or("unknown"),
            );
            let reason = match kind {
                ErrorKind::UntrustedKey => "key_not_allowlisted",
                _ => outcome.reason.as_deref().unwrap_or("bad_signature"),
            };
            tracing::warn!(evt = "ku_rejected", error = %kind, reason, "publish rejected");
            return Err(ApiError::with_reason(kind, reason));
        }
        if !outcome.ok {
            state
                .metrics
                .record_verify_failure(outcome.reason.as_deref().unwrap_or("unknown"));
        }
        Some(VerifyInfo {
            ok: outcome.ok,
            trusted: outcome.trusted,
            reason: outcome.reason.clone().or_else(|| outcome.trust_reason.clone()),
        })
    } else {
        None
    };

    let db_started = Instant::now();
    let outcome = state.store.store(&req.ku, now_ms()).await?;
    state.metrics.observe_db_write(db_started.elapsed().as_secs_f64() * 1000.0);

    let enqueued = if outcome.was_new {
        state.metrics.record_ku_stored();

        let enqueued = if state.config.broadcast_enabled() {
            let payload = json!({"cid": outcome.cid, "ku_type": req.ku.ku_type});
            state
                .outbox
                .enqueue("ku_announce", "local-subscribers", &payload, now_ms())
                .await?;
            true
        } else {
            false
        };

        let trusted = verify_info.as_ref().map(|v| v.trusted).unwrap_or(true);
        state.broker.publish(EventFrame::Ku {
            cid: outcome.cid.clone(),
            ku_type: req.ku.ku_type.clone(),
            trusted,
        });

        tracing::info!(evt = "ku_accepted", cid = %outcome.cid, ku_type = %req.ku.ku_type, "ku stored");
        enqueued
    } else {
        state.metrics.record_ku_deduplicated();
        tracing::info!(evt = "ku_deduplicated", cid = %outcome.cid, "ku already stored");
        false
    };

    state.metrics.observe_http_publish(started.elapsed().as_secs_f64() * 1000.0);

    Ok(Json(json!({
        "ok": true,
        "cid": outcome.cid,
        "stored": true,
        "enqueued": enqueued,
        "verify": verify_info,
    })))
}
