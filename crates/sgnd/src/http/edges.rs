//! `POST /edges`, `GET /edges/:cid`: the typed KU-relation graph surface
//! (spec §4.7, §4.8).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use sgn_core::{Edge, EdgeType, ErrorKind};

use crate::error::ApiError;
use crate::state::{now_ms, SharedState};
use crate::verify_logic::{enforce_rejection, evaluate_key};

#[derive(Debug, Deserialize)]
pub struct CreateEdgeRequest {
    pub src: String,
    pub dst: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub pub_pem: Option<String>,
}

pub async fn create_edge(
    State(state): State<SharedState>,
    Json(req): Json<CreateEdgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let edge_type = EdgeType::parse(&req.edge_type).ok_or_else(|| ApiError::new(ErrorKind::InvalidType))?;

    if req.src.is_empty() || req.dst.is_empty() {
        return Err(ApiError::new(ErrorKind::MissingCid));
    }

    // Mirrors publish's verify+trust gate (spec §4.7): an untrusted
    // signer is rejected under `enforce`, stored without attribution
    // under `warn`. Edges carry no signature, just a `pub_pem` claim of
    // the inserting key, so the gate checks key-id trust directly.
    let publisher_key_id = if req.verify {
        let pub_pem = req.pub_pem.as_deref().ok_or_else(|| ApiError::new(ErrorKind::BadRequest))?;
        let outcome = evaluate_key(pub_pem, &state.trust);
        if let Some(kind) = enforce_rejection(&outcome, &state.trust) {
            return Err(ApiError::new(kind));
        }
        if outcome.trusted {
            outcome.key_id
        } else {
            None
        }
    } else {
        None
    };

    let edge = Edge {
        src: req.src,
        dst: req.dst,
        edge_type,
        publisher_key_id,
        created_at: now_ms(),
    };

    let inserted = state.edges.insert_if_absent(&edge).await?;
    if inserted {
        state.metrics.record_edge_inserted(edge_type.as_str());
        state.broker.publish(sgn_events::EventFrame::Edge {
            src: edge.src.clone(),
            dst: edge.dst.clone(),
            edge_type: edge_type.as_str().to_string(),
        });
    }

    Ok(Json(json!({
        "stored": true,
        "inserted": inserted,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListEdgesQuery {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default, rename = "type")]
    pub edge_type: Option<String>,
}

pub async fn list_edges(
    State(state): State<SharedState>,
    Path(cid): Path<String>,
    Query(query): Query<ListEdgesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let direction = query.direction.as_deref().unwrap_or("out");
    let mut edges = match direction {
        "in" => state.edges.list_incoming(&cid).await?,
        _ => state.edges.list_outgoing(&cid).await?,
    };

    if let Some(type_filter) = query.edge_type.as_deref() {
        let wanted = EdgeType::parse(type_filter).ok_or_else(|| ApiError::new(ErrorKind::InvalidType))?;
        edges.retain(|e| e.edge_type == wanted);
    }

    Ok(Json(json!({ "edges": edges })))
}
