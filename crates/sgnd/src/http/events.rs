//! `GET /events`: WebSocket upgrade with optional Origin/bearer auth
//! (spec §6, §4.6). Unauthorized connections are refused before the
//! upgrade completes rather than accepted and then dropped.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use sgn_events::serve_subscriber;

use crate::state::SharedState;

pub async fn events(
    State(state): State<SharedState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(expected_origin) = state.config.events_origin.as_deref() {
        let origin_ok = headers
            .get(axum::http::header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(|origin| origin == expected_origin)
            .unwrap_or(false);
        if !origin_ok {
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    if let Some(expected_token) = state.config.events_bearer.as_deref() {
        let bearer_ok = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| token == expected_token)
            .unwrap_or(false);
        if !bearer_ok {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let broker = state.broker.clone();
    let metrics = state.metrics.clone();
    ws.on_upgrade(move |socket| async move {
        metrics.set_ws_clients(broker.subscriber_count() + 1);
        serve_subscriber(socket, broker.clone(), metrics.clone()).await;
        metrics.set_ws_clients(broker.subscriber_count());
    })
}
