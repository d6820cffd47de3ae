//! Durable outbox table: at-least-once delivery with fixed backoff
//! (spec §4.5).

use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// Backoff ladder in seconds, indexed by attempt count (1-based).
pub const BACKOFF_LADDER_SECS: [i64; 5] = [1, 2, 5, 10, 30];

/// Once `attempts` reaches this count without success, the entry is
/// marked `dead` and the scheduler stops retrying it.
pub const MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Dead,
}

impl OutboxStatus {
    fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Dead => "dead",
        }
    }

    fn parse(s: &str) -> OutboxStatus {
        match s {
            "sent" => OutboxStatus::Sent,
            "dead" => OutboxStatus::Dead,
            _ => OutboxStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub seq: i64,
    pub kind: String,
    pub target: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub status: OutboxStatus,
    pub next_try_at: i64,
    pub created_at: i64,
    pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct OutboxStore {
    pool: SqlitePool,
}

impl OutboxStore {
    pub async fn open(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(4).connect(url).await?;
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        let store = OutboxStore { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS outbox (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                target TEXT NOT NULL,
                payload TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                next_try_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                last_error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_outbox_due ON outbox(status, next_try_at, seq)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn enqueue(
        &self,
        kind: &str,
        target: &str,
        payload: &serde_json::Value,
        now_ms: i64,
    ) -> Result<i64> {
        let payload_json = serde_json::to_string(payload)?;
        let result = sqlx::query(
            r#"
            INSERT INTO outbox (kind, target, payload, attempts, status, next_try_at, created_at)
            VALUES (?, ?, ?, 0, 'pending', ?, ?)
            "#,
        )
        .bind(kind)
        .bind(target)
        .bind(payload_json)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Returns up to `limit` pending entries due at or before `now_ms`,
    /// ordered `(next_try_at ASC, seq ASC)` (spec §4.5).
    pub async fn due_entries(&self, now_ms: i64, limit: i64) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM outbox
            WHERE status = 'pending' AND next_try_at <= ?
            ORDER BY next_try_at ASC, seq ASC
            LIMIT ?
            "#,
        )
        .bind(now_ms)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    pub async fn mark_sent(&self, seq: i64) -> Result<()> {
        sqlx::query("UPDATE outbox SET status = 'sent' WHERE seq = ?")
            .bind(seq)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Records a failed delivery attempt. Advances `next_try_at` by the
    /// backoff ladder, or marks the entry `dead` past [`MAX_ATTEMPTS`].
    pub async fn mark_failed(&self, seq: i64, now_ms: i64, error: &str) -> Result<OutboxStatus> {
        let row = sqlx::query("SELECT attempts FROM outbox WHERE seq = ?")
            .bind(seq)
            .fetch_one(&self.pool)
            .await?;
        let attempts: i32 = row.try_get("attempts")?;
        let attempts = attempts + 1;

        if attempts >= MAX_ATTEMPTS {
            sqlx::query(
                "UPDATE outbox SET attempts = ?, status = 'dead', last_error = ? WHERE seq = ?",
            )
            .bind(attempts)
            .bind(error)
            .bind(seq)
            .execute(&self.pool)
            .await?;
            return Ok(OutboxStatus::Dead);
        }

        let delay_secs = BACKOFF_LADDER_SECS[(attempts - 1) as usize];
        let next_try_at = now_ms + delay_secs * 1000;
        sqlx::query(
            "UPDATE outbox SET attempts = ?, next_try_at = ?, last_error = ? WHERE seq = ?",
        )
        .bind(attempts)
        .bind(next_try_at)
        .bind(error)
        .bind(seq)
        .execute(&self.pool)
        .await?;
        Ok(OutboxStatus::Pending)
    }

    pub async fn counts(&self) -> Result<OutboxCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END) as pending,
                SUM(CASE WHEN status = 'sent' THEN 1 ELSE 0 END) as sent,
                SUM(CASE WHEN status = 'dead' THEN 1 ELSE 0 END) as dead
            FROM outbox
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxCounts {
            pending: row.try_get::<Option<i64>, _>("pending")?.unwrap_or(0),
            sent: row.try_get::<Option<i64>, _>("sent")?.unwrap_or(0),
            dead: row.try_get::<Option<i64>, _>("dead")?.unwrap_or(0),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct OutboxCounts {
    pub pending: i64,
    pub sent: i64,
    pub dead: i64,
}

fn row_to_entry(row: &SqliteRow) -> Result<OutboxEntry> {
    let payload: String = row.try_get("payload")?;
    Ok(OutboxEntry {
        seq: row.try_get("seq")?,
        kind: row.try_get("kind")?,
        target: row.try_get("target")?,
        payload: serde_json::from_str(&payload)?,
        attempts: row.try_get("attempts")?,
        status: OutboxStatus::parse(row.try_get::<String, _>("status")?.as_str()),
        next_try_at: row.try_get("next_try_at")?,
        created_at: row.try_get("created_at")?,
        last_error: row.try_get("last_error")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (tempfile::TempDir, OutboxStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("outbox.db").display());
        let store = OutboxStore::open(&url).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn enqueue_then_due_entries_returns_it() {
        let (_dir, store) = open_store().await;
        store
            .enqueue("ku_announce", "peer-1", &serde_json::json!({"cid": "x"}), 1000)
            .await
            .unwrap();
        let due = store.due_entries(1000, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].attempts, 0);
    }

    #[tokio::test]
    async fn entries_not_yet_due_are_excluded() {
        let (_dir, store) = open_store().await;
        store
            .enqueue("ku_announce", "peer-1", &serde_json::json!({}), 5000)
            .await
            .unwrap();
        let due = store.due_entries(1000, 10).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn mark_failed_applies_backoff_ladder() {
        let (_dir, store) = open_store().await;
        let seq = store
            .enqueue("ku_announce", "peer-1", &serde_json::json!({}), 1000)
            .await
            .unwrap();

        let status = store.mark_failed(seq, 1000, "timeout").await.unwrap();
        assert_eq!(status, OutboxStatus::Pending);

        let due = store.due_entries(1000 + BACKOFF_LADDER_SECS[0] * 1000, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].attempts, 1);
    }

    #[tokio::test]
    async fn exhausting_attempts_marks_dead() {
        let (_dir, store) = open_store().await;
        let seq = store
            .enqueue("ku_announce", "peer-1", &serde_json::json!({}), 1000)
            .await
            .unwrap();

        let mut now = 1000;
        for _ in 0..MAX_ATTEMPTS - 1 {
            store.mark_failed(seq, now, "fail").await.unwrap();
            now += 60_000;
        }
        let status = store.mark_failed(seq, now, "fail").await.unwrap();
        assert_eq!(status, OutboxStatus::Dead);

        let due = store.due_entries(now + 1_000_000, 10).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn ordering_is_next_try_at_then_seq() {
        let (_dir, store) = open_store().await;
        // Enqueued out of next_try_at order; due_entries must still return
        // the earlier-due entry first even though it has the higher seq.
        store.enqueue("k", "t", &serde_json::json!({}), 2000).await.unwrap();
        store.enqueue("k", "t", &serde_json::json!({}), 1000).await.unwrap();
        let due = store.due_entries(5000, 10).await.unwrap();
        assert_eq!(due[0].next_try_at, 1000);
        assert_eq!(due[1].next_try_at, 2000);
    }
}
