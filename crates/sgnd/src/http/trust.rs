//! `POST /trust/reload`: atomic hot-reload of the trust policy (spec §4.3).

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::state::SharedState;

pub async fn reload(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    state
        .trust
        .reload()
        .map_err(|err| ApiError::with_reason(sgn_core::ErrorKind::ServerError, err.to_string()))?;
    Ok(Json(json!({ "reloaded": true })))
}
