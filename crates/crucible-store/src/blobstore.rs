//! Content-addressed blob storage: write-once per hash, sharded by the
//! first two hex characters of the hash.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crucible_types::{canon::sha256_hex, BlobRef};

use crate::error::{StoreError, StoreResult};

/// Common interface for blob persistence backends. Grounded on the same
/// shape as a pluggable storage backend: read/write/exists keyed by a
/// relative path, with the content hash as the only identity that matters.
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under their content hash and returns the resulting
    /// `BlobRef`. Writing the same hash twice with identical bytes is a
    /// no-op; writing the same hash with different bytes is a logic error
    /// in the caller (hashes are computed from `bytes`, so this cannot
    /// actually happen without a hash collision).
    fn put(&self, bytes: &[u8], mime: &str) -> StoreResult<BlobRef>;

    /// Reads the bytes for a previously written blob.
    fn get(&self, hash: &str) -> StoreResult<Vec<u8>>;

    /// Reports whether a blob with this hash has been written.
    fn exists(&self, hash: &str) -> StoreResult<bool>;
}

/// Local-filesystem blob store rooted at a movie directory.
pub struct LocalBlobStore {
    movie_root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(movie_root: impl Into<PathBuf>) -> Self {
        Self {
            movie_root: movie_root.into(),
        }
    }

    fn path_for(&self, blob: &BlobRef) -> PathBuf {
        self.movie_root.join(blob.relative_path())
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, bytes: &[u8], mime: &str) -> StoreResult<BlobRef> {
        let hash = sha256_hex(bytes);
        let blob = BlobRef::new(hash, bytes.len() as u64, mime);
        let path = self.path_for(&blob);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        if !path.exists() {
            std::fs::write(&path, bytes).map_err(|source| StoreError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(blob)
    }

    fn get(&self, hash: &str) -> StoreResult<Vec<u8>> {
        let candidate = self.find_by_hash(hash)?;
        std::fs::read(&candidate).map_err(|source| StoreError::Read {
            path: candidate.display().to_string(),
            source,
        })
    }

    fn exists(&self, hash: &str) -> StoreResult<bool> {
        Ok(self.find_by_hash(hash).is_ok())
    }
}

impl LocalBlobStore {
    fn find_by_hash(&self, hash: &str) -> StoreResult<PathBuf> {
        let shard = self.movie_root.join("blobs").join(&hash[..hash.len().min(2)]);
        let Ok(entries) = std::fs::read_dir(&shard) else {
            return Err(StoreError::BlobNotFound {
                hash: hash.to_string(),
            });
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(hash) {
                return Ok(entry.path());
            }
        }
        Err(StoreError::BlobNotFound {
            hash: hash.to_string(),
        })
    }
}

/// In-memory blob store used by tests and the simulated-provider scenarios.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bytes: &[u8], mime: &str) -> StoreResult<BlobRef> {
        let hash = sha256_hex(bytes);
        let blob = BlobRef::new(hash.clone(), bytes.len() as u64, mime);
        self.blobs
            .lock()
            .unwrap()
            .entry(hash)
            .or_insert_with(|| (bytes.to_vec(), mime.to_string()));
        Ok(blob)
    }

    fn get(&self, hash: &str) -> StoreResult<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(hash)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StoreError::BlobNotFound {
                hash: hash.to_string(),
            })
    }

    fn exists(&self, hash: &str) -> StoreResult<bool> {
        Ok(self.blobs.lock().unwrap().contains_key(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn local_store_round_trips_bytes() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let blob = store.put(b"hello", "text/plain").unwrap();
        assert!(store.exists(&blob.hash).unwrap());
        assert_eq!(store.get(&blob.hash).unwrap(), b"hello");
    }

    #[test]
    fn local_store_is_idempotent_for_same_hash() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let a = store.put(b"same", "text/plain").unwrap();
        let b = store.put(b"same", "text/plain").unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn in_memory_store_round_trips_bytes() {
        let store = InMemoryBlobStore::new();
        let blob = store.put(b"world", "application/json").unwrap();
        assert_eq!(store.get(&blob.hash).unwrap(), b"world");
    }

    #[test]
    fn missing_hash_is_not_found() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(
            store.get("deadbeef"),
            Err(StoreError::BlobNotFound { .. })
        ));
    }
}
