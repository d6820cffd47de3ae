//! Bounded-depth BFS traversal over the edge graph (spec §4.7).

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use sgn_core::Edge;

use crate::error::Result;
use crate::store::EdgeStore;

/// Traversal never explores beyond this many hops from the start node,
/// regardless of what the caller requests.
pub const MAX_DEPTH: u32 = 4;

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub root: String,
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    pub truncated: bool,
}

/// Explores outward from `root` up to `requested_depth` hops (clamped to
/// [`MAX_DEPTH`]), following outgoing edges only.
pub async fn traverse(store: &EdgeStore, root: &str, requested_depth: u32) -> Result<GraphView> {
    let depth = requested_depth.min(MAX_DEPTH);

    let mut visited: HashSet<String> = HashSet::new();
    let mut edges_seen: HashSet<(String, String, &'static str)> = HashSet::new();
    let mut collected_edges: Vec<Edge> = Vec::new();
    let mut queue: VecDeque<(String, u32)> = VecDeque::new();

    visited.insert(root.to_string());
    queue.push_back((root.to_string(), 0));

    while let Some((node, node_depth)) = queue.pop_front() {
        if node_depth >= depth {
            continue;
        }
        for edge in store.list_outgoing(&node).await? {
            let key = (edge.src.clone(), edge.dst.clone(), edge.edge_type.as_str());
            if edges_seen.insert(key) {
                collected_edges.push(edge.clone());
            }

            if visited.insert(edge.dst.clone()) {
                queue.push_back((edge.dst.clone(), node_depth + 1));
            }
        }
    }

    let mut nodes: Vec<String> = visited.into_iter().collect();
    nodes.sort();

    Ok(GraphView {
        root: root.to_string(),
        nodes,
        edges: collected_edges,
        truncated: requested_depth > MAX_DEPTH,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgn_core::EdgeType;

    async fn open_store() -> (tempfile::TempDir, EdgeStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("edges.db").display());
        let store = EdgeStore::open(&url).await.unwrap();
        (dir, store)
    }

    fn edge(src: &str, dst: &str, edge_type: EdgeType) -> Edge {
        Edge {
            src: src.into(),
            dst: dst.into(),
            edge_type,
            publisher_key_id: None,
            created_at: 1000,
        }
    }

    #[tokio::test]
    async fn traversal_finds_neighbors_within_depth() {
        let (_dir, store) = open_store().await;
        store.insert_if_absent(&edge("a", "b", EdgeType::AppliesTo)).await.unwrap();
        store.insert_if_absent(&edge("b", "c", EdgeType::Verifies)).await.unwrap();
        store.insert_if_absent(&edge("c", "d", EdgeType::Supersedes)).await.unwrap();

        let view = traverse(&store, "a", 2).await.unwrap();
        assert!(view.nodes.contains(&"c".to_string()));
        assert!(!view.nodes.contains(&"d".to_string()));
    }

    #[tokio::test]
    async fn depth_is_clamped_to_max() {
        let (_dir, store) = open_store().await;
        let mut prev = "n0".to_string();
        for i in 1..=6 {
            let next = format!("n{i}");
            store
                .insert_if_absent(&edge(&prev, &next, EdgeType::AppliesTo))
                .await
                .unwrap();
            prev = next;
        }

        let view = traverse(&store, "n0", 100).await.unwrap();
        assert!(view.truncated);
        assert!(!view.nodes.contains(&"n6".to_string()));
        assert!(view.nodes.contains(&format!("n{MAX_DEPTH}")));
    }

    #[tokio::test]
    async fn isolated_node_yields_itself_only() {
        let (_dir, store) = open_store().await;
        let view = traverse(&store, "lonely", 4).await.unwrap();
        assert_eq!(view.nodes, vec!["lonely".to_string()]);
        assert!(view.edges.is_empty());
    }
}
