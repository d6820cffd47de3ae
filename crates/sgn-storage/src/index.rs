//! sqlite projection index over stored KUs: structured + token search
//! (spec §4.4).

use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use sgn_core::{KuRecord, SearchQuery, Signature};

use crate::error::Result;

#[derive(Clone)]
pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    pub async fn open(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        let store = IndexStore { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kus (
                cid TEXT PRIMARY KEY,
                ku_type TEXT NOT NULL,
                title TEXT,
                description TEXT,
                solution TEXT,
                severity TEXT,
                confidence REAL,
                tags TEXT NOT NULL,
                affected_systems TEXT NOT NULL,
                discovered_by TEXT,
                signature_json TEXT,
                reputation_score REAL NOT NULL,
                created_at INTEGER NOT NULL,
                accessed_at INTEGER NOT NULL,
                access_count INTEGER NOT NULL,
                search_blob TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kus_type ON kus(ku_type)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kus_severity ON kus(severity)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kus_confidence ON kus(confidence)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts the record if `cid` is new. Returns `false` if it already
    /// existed (store is idempotent by content address).
    pub async fn insert_if_absent(&self, record: &KuRecord) -> Result<bool> {
        let tags_json = serde_json::to_string(&record.tags)?;
        let affected_json = serde_json::to_string(&record.affected_systems)?;
        let signature_json = match &record.signature {
            Some(sig) => Some(serde_json::to_string(sig)?),
            None => None,
        };
        let search_blob = build_search_blob(record);

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO kus (
                cid, ku_type, title, description, solution, severity, confidence,
                tags, affected_systems, discovered_by, signature_json,
                reputation_score, created_at, accessed_at, access_count, search_blob
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            "#,
        )
        .bind(&record.cid)
        .bind(&record.ku_type)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.solution)
        .bind(&record.severity)
        .bind(record.confidence)
        .bind(&tags_json)
        .bind(&affected_json)
        .bind(&record.discovered_by)
        .bind(&signature_json)
        .bind(record.reputation_score)
        .bind(record.created_at)
        .bind(record.accessed_at)
        .bind(record.access_count)
        .bind(&search_blob)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetches a record by CID, bumping `accessed_at`/`access_count` (spec §4.4).
    pub async fn get_and_touch(&self, cid: &str, now_ms: i64) -> Result<Option<KuRecord>> {
        let row = sqlx::query("SELECT * FROM kus WHERE cid = ?")
            .bind(cid)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let record = row_to_record(&row)?;

        sqlx::query("UPDATE kus SET accessed_at = ?, access_count = access_count + 1 WHERE cid = ?")
            .bind(now_ms)
            .bind(cid)
            .execute(&self.pool)
            .await?;

        Ok(Some(KuRecord {
            accessed_at: now_ms,
            access_count: record.access_count + 1,
            ..record
        }))
    }

    /// Fetches a record without updating access stats (used by probes/graph).
    pub async fn get(&self, cid: &str) -> Result<Option<KuRecord>> {
        let row = sqlx::query("SELECT * FROM kus WHERE cid = ?")
            .bind(cid)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_record(&r)).transpose()
    }

    pub async fn exists(&self, cid: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM kus WHERE cid = ?")
            .bind(cid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<KuRecord>> {
        let mut sql = String::from("SELECT * FROM kus WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(ku_type) = &query.ku_type {
            sql.push_str(" AND ku_type = ?");
            binds.push(ku_type.clone());
        }
        if let Some(severity) = &query.severity {
            sql.push_str(" AND severity = ?");
            binds.push(severity.clone());
        }
        for tag in &query.tags {
            sql.push_str(" AND (',' || tags || ',') LIKE ?");
            binds.push(format!("%,{tag},%"));
        }
        for system in &query.affected_systems {
            sql.push_str(" AND (',' || affected_systems || ',') LIKE ?");
            binds.push(format!("%,{system},%"));
        }
        if let Some(text) = &query.text {
            for token in text.split_whitespace() {
                sql.push_str(" AND search_blob LIKE ?");
                binds.push(format!("%{}%", token.to_lowercase()));
            }
        }

        sql.push_str(" ORDER BY confidence DESC, access_count DESC, created_at DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        for bind in &binds {
            q = q.bind(bind);
        }
        q = q.bind(query.normalized_limit() as i64);

        let rows = q.fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = row_to_record(row)?;
            if let Some(min_conf) = query.min_confidence {
                if record.confidence.map(|c| c < min_conf).unwrap_or(true) {
                    continue;
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM kus")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    /// Lists every CID in the index, for the consistency probe (spec §4.9).
    pub async fn all_cids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT cid FROM kus").fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("cid").map_err(Into::into))
            .collect()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn build_search_blob(record: &KuRecord) -> String {
    let mut parts = vec![record.ku_type.clone()];
    parts.extend(record.title.clone());
    parts.extend(record.description.clone());
    parts.extend(record.solution.clone());
    parts.extend(record.tags.clone());
    parts.extend(record.affected_systems.clone());
    parts.join(" ").to_lowercase()
}

fn row_to_record(row: &SqliteRow) -> Result<KuRecord> {
    let tags: Vec<String> = serde_json::from_str(row.try_get::<String, _>("tags")?.as_str())?;
    let affected_systems: Vec<String> =
        serde_json::from_str(row.try_get::<String, _>("affected_systems")?.as_str())?;
    let signature: Option<Signature> = match row.try_get::<Option<String>, _>("signature_json")? {
        Some(text) => Some(serde_json::from_str(&text)?),
        None => None,
    };

    let cid: String = row.try_get("cid")?;
    Ok(KuRecord {
        hash: cid.clone(),
        cid,
        ku_type: row.try_get("ku_type")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        solution: row.try_get("solution")?,
        severity: row.try_get("severity")?,
        confidence: row.try_get("confidence")?,
        tags,
        affected_systems,
        discovered_by: row.try_get("discovered_by")?,
        signature,
        reputation_score: row.try_get("reputation_score")?,
        created_at: row.try_get("created_at")?,
        accessed_at: row.try_get("accessed_at")?,
        access_count: row.try_get("access_count")?,
    })
}
