//! Content-addressed blob files on disk (spec §4.4).
//!
//! Layout is `<root>/<aa>/<bb>/<cid>.json`, sharded on the first two
//! hex bytes of the digest so no directory accumulates millions of
//! entries. Writes go to a sibling `.tmp-<pid>` file, fsync, then
//! `rename` into place, so a reader never observes a partially written
//! blob and a crash mid-write never corrupts an existing one.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use sgn_core::canonical::parse_cid;

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(BlobStore { root })
    }

    fn path_for(&self, cid: &str) -> PathBuf {
        let hex = parse_cid(cid).unwrap_or(cid);
        let shard_a = &hex[0..2.min(hex.len())];
        let shard_b = &hex[2..4.min(hex.len())];
        self.root.join(shard_a).join(shard_b).join(format!("{cid}.json"))
    }

    /// Returns `true` if a blob already exists for `cid`.
    pub async fn exists(&self, cid: &str) -> bool {
        fs::metadata(self.path_for(cid)).await.is_ok()
    }

    /// Writes `bytes` for `cid` if absent. No-op if the blob already
    /// exists — content addressing means the bytes would be identical.
    pub async fn put_if_absent(&self, cid: &str, bytes: &[u8]) -> Result<bool> {
        if self.exists(cid).await {
            return Ok(false);
        }
        let final_path = self.path_for(cid);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = final_path.with_extension(format!("json.tmp-{}", std::process::id()));

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &final_path).await?;
        Ok(true)
    }

    pub async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(cid)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Lists every CID present on disk, for the consistency probe (spec §4.9).
    pub async fn list_cids(&self) -> Result<Vec<String>> {
        let mut cids = Vec::new();
        let mut shard_a_entries = fs::read_dir(&self.root).await?;
        while let Some(shard_a) = shard_a_entries.next_entry().await? {
            if !shard_a.file_type().await?.is_dir() {
                continue;
            }
            let mut shard_b_entries = fs::read_dir(shard_a.path()).await?;
            while let Some(shard_b) = shard_b_entries.next_entry().await? {
                if !shard_b.file_type().await?.is_dir() {
                    continue;
                }
                let mut files = fs::read_dir(shard_b.path()).await?;
                while let Some(entry) = files.next_entry().await? {
                    if let Some(name) = entry.file_name().to_str() {
                        if let Some(cid) = name.strip_suffix(".json") {
                            cids.push(cid.to_string());
                        }
                    }
                }
            }
        }
        Ok(cids)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let cid = "cid-blake3:aabbcc";
        assert!(store.put_if_absent(cid, b"hello").await.unwrap());
        assert_eq!(store.get(cid).await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn second_put_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let cid = "cid-blake3:aabbcc";
        assert!(store.put_if_absent(cid, b"first").await.unwrap());
        assert!(!store.put_if_absent(cid, b"second").await.unwrap());
        assert_eq!(store.get(cid).await.unwrap(), Some(b"first".to_vec()));
    }

    #[tokio::test]
    async fn missing_blob_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("cid-blake3:doesnotexist").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_cids_finds_written_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        store.put_if_absent("cid-blake3:one", b"1").await.unwrap();
        store.put_if_absent("cid-blake3:two", b"2").await.unwrap();
        let mut cids = store.list_cids().await.unwrap();
        cids.sort();
        assert_eq!(cids, vec!["cid-blake3:one".to_string(), "cid-blake3:two".to_string()]);
    }
}
