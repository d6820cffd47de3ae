//! Edge table: unique `(src, dst, type)` relations between KUs (spec §4.7).

use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use sgn_core::{Edge, EdgeType};

use crate::error::Result;

#[derive(Clone)]
pub struct EdgeStore {
    pool: SqlitePool,
}

impl EdgeStore {
    pub async fn open(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(8).connect(url).await?;
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        let store = EdgeStore { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                src TEXT NOT NULL,
                dst TEXT NOT NULL,
                edge_type TEXT NOT NULL,
                publisher_key_id TEXT,
                created_at INTEGER NOT NULL,
                UNIQUE(src, dst, edge_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts the edge if it doesn't already exist. Returns `false` for
    /// a duplicate `(src, dst, type)` triple.
    pub async fn insert_if_absent(&self, edge: &Edge) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO edges (src, dst, edge_type, publisher_key_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&edge.src)
        .bind(&edge.dst)
        .bind(edge.edge_type.as_str())
        .bind(&edge.publisher_key_id)
        .bind(edge.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_outgoing(&self, cid: &str) -> Result<Vec<Edge>> {
        let rows = sqlx::query("SELECT * FROM edges WHERE src = ? ORDER BY created_at ASC")
            .bind(cid)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_edge).collect()
    }

    pub async fn list_incoming(&self, cid: &str) -> Result<Vec<Edge>> {
        let rows = sqlx::query("SELECT * FROM edges WHERE dst = ? ORDER BY created_at ASC")
            .bind(cid)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_edge).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM edges")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }
}

fn row_to_edge(row: &SqliteRow) -> Result<Edge> {
    let edge_type_str: String = row.try_get("edge_type")?;
    Ok(Edge {
        src: row.try_get("src")?,
        dst: row.try_get("dst")?,
        edge_type: EdgeType::parse(&edge_type_str).unwrap_or(EdgeType::AppliesTo),
        publisher_key_id: row.try_get("publisher_key_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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
    async fn duplicate_edge_is_rejected() {
        let (_dir, store) = open_store().await;
        let e = edge("a", "b", EdgeType::AppliesTo);
        assert!(store.insert_if_absent(&e).await.unwrap());
        assert!(!store.insert_if_absent(&e).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_pair_different_type_is_distinct() {
        let (_dir, store) = open_store().await;
        store.insert_if_absent(&edge("a", "b", EdgeType::AppliesTo)).await.unwrap();
        store.insert_if_absent(&edge("a", "b", EdgeType::Verifies)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_outgoing_and_incoming() {
        let (_dir, store) = open_store().await;
        store.insert_if_absent(&edge("a", "b", EdgeType::AppliesTo)).await.unwrap();
        store.insert_if_absent(&edge("c", "b", EdgeType::Supersedes)).await.unwrap();

        assert_eq!(store.list_outgoing("a").await.unwrap().len(), 1);
        assert_eq!(store.list_incoming("b").await.unwrap().len(), 2);
        assert_eq!(store.list_outgoing("b").await.unwrap().len(), 0);
    }
}
