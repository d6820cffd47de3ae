//! `GET /graph/:cid`: bounded-depth BFS over the edge graph (spec §4.7).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use sgn_edges::traverse;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    #[serde(default)]
    pub depth: Option<u32>,
}

const DEFAULT_DEPTH: u32 = 2;

pub async fn get_graph(
    State(state): State<SharedState>,
    Path(cid): Path<String>,
    Query(query): Query<GraphQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.metrics.record_graph_request();
    let depth = query.depth.unwrap_or(DEFAULT_DEPTH);
    let view = traverse(&state.edges, &cid, depth).await?;

    Ok(Json(json!({
        "start": view.root,
        "depth": depth,
        "edges": view.edges,
        "truncated": view.truncated,
    })))
}
