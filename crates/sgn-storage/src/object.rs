//! The object store: blob files plus sqlite index, combined behind one
//! content-addressed `store`/`retrieve`/`search` API (spec §4.4).

use sgn_core::{cid as compute_cid, Ku, KuRecord, SearchQuery};

use crate::blob::BlobStore;
use crate::error::Result;
use crate::index::IndexStore;

#[derive(Clone)]
pub struct ObjectStore {
    blobs: BlobStore,
    index: IndexStore,
}

/// Outcome of a `store` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOutcome {
    pub cid: String,
    pub was_new: bool,
}

impl ObjectStore {
    pub async fn open(blob_dir: impl Into<std::path::PathBuf>, index_url: &str) -> Result<Self> {
        Ok(ObjectStore {
            blobs: BlobStore::open(blob_dir).await?,
            index: IndexStore::open(index_url).await?,
        })
    }

    /// Persists `ku`, deduplicating on its content address. Idempotent:
    /// storing the same KU twice returns `was_new: false` the second time.
    pub async fn store(&self, ku: &Ku, now_ms: i64) -> Result<StoreOutcome> {
        let cid = compute_cid(ku)?;
        let bytes = serde_json::to_vec(ku)?;
        let blob_written = self.blobs.put_if_absent(&cid, &bytes).await?;

        let record = KuRecord::from_ku(&cid, ku, now_ms);
        let index_written = self.index.insert_if_absent(&record).await?;

        Ok(StoreOutcome {
            cid,
            was_new: blob_written || index_written,
        })
    }

    pub async fn retrieve(&self, cid: &str, now_ms: i64) -> Result<Option<Ku>> {
        let Some(bytes) = self.blobs.get(cid).await? else {
            return Ok(None);
        };
        let ku: Ku = serde_json::from_slice(&bytes)?;
        self.index.get_and_touch(cid, now_ms).await?;
        Ok(Some(ku))
    }

    pub async fn get_record(&self, cid: &str) -> Result<Option<KuRecord>> {
        self.index.get(cid).await
    }

    pub async fn exists(&self, cid: &str) -> Result<bool> {
        self.index.exists(cid).await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<KuRecord>> {
        self.index.search(query).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.index.count().await
    }

    /// Reconciles blob files against index rows (spec §4.9).
    pub async fn consistency_report(&self) -> Result<ConsistencyReport> {
        let mut fs_cids: Vec<String> = self.blobs.list_cids().await?;
        let mut db_cids: Vec<String> = self.index.all_cids().await?;
        fs_cids.sort();
        db_cids.sort();

        let orphan_blobs: Vec<String> = fs_cids
            .iter()
            .filter(|c| db_cids.binary_search(c).is_err())
            .cloned()
            .collect();
        let missing_blobs: Vec<String> = db_cids
            .iter()
            .filter(|c| fs_cids.binary_search(c).is_err())
            .cloned()
            .collect();

        Ok(ConsistencyReport {
            blob_count: fs_cids.len(),
            index_count: db_cids.len(),
            orphan_blobs,
            missing_blobs,
        })
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }
}

/// Result of the fs-vs-db reconciliation probe (spec §4.9).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyReport {
    pub blob_count: usize,
    pub index_count: usize,
    /// CIDs with a blob file but no index row.
    pub orphan_blobs: Vec<String>,
    /// CIDs with an index row but no blob file.
    pub missing_blobs: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphan_blobs.is_empty() && self.missing_blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgn_core::{Provenance, SCHEMA_ID};

    fn sample_ku(title: &str) -> Ku {
        Ku {
            ku_type: "ku.patch.migration".into(),
            schema_id: SCHEMA_ID.into(),
            content_type: "application/json".into(),
            payload: serde_json::json!({"title": title, "severity": "high"}),
            parents: vec![],
            sources: vec![],
            tests: vec![],
            provenance: Provenance::default(),
            tags: vec!["db".into()],
            sig: None,
        }
    }

    async fn open_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let blob_dir = dir.path().join("blobs");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("sgn.db").display());
        let store = ObjectStore::open(blob_dir, &db_url).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let (_dir, store) = open_store().await;
        let ku = sample_ku("Postgres deadlock fix");
        let outcome = store.store(&ku, 1000).await.unwrap();
        assert!(outcome.was_new);

        let fetched = store.retrieve(&outcome.cid, 2000).await.unwrap().unwrap();
        assert_eq!(fetched.title(), ku.title());
    }

    #[tokio::test]
    async fn duplicate_store_is_not_new() {
        let (_dir, store) = open_store().await;
        let ku = sample_ku("Postgres deadlock fix");
        let first = store.store(&ku, 1000).await.unwrap();
        let second = store.store(&ku, 1500).await.unwrap();
        assert_eq!(first.cid, second.cid);
        assert!(!second.was_new);
    }

    #[tokio::test]
    async fn search_by_tag_finds_match() {
        let (_dir, store) = open_store().await;
        store.store(&sample_ku("fix a"), 1000).await.unwrap();
        let results = store
            .search(&SearchQuery {
                tags: vec!["db".into()],
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn consistency_report_is_clean_for_fresh_store() {
        let (_dir, store) = open_store().await;
        store.store(&sample_ku("fix a"), 1000).await.unwrap();
        let report = store.consistency_report().await.unwrap();
        assert!(report.is_consistent());
    }
}
