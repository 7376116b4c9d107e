//! Manifest persistence: versioned manifest files plus the `current.json`
//! pointer with optimistic-concurrency on save.

use std::path::Path;

use chrono::Utc;
use crucible_types::{CurrentPointer, Manifest, Revision};

use crate::error::{StoreError, StoreResult};
use crate::paths;

/// Loads the `current.json` pointer, if any has been written yet.
pub fn load_current(movie_root: &Path) -> StoreResult<Option<CurrentPointer>> {
    let path = paths::current_json_path(movie_root);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let pointer = serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(pointer))
}

/// Loads the manifest for a specific revision.
pub fn load_manifest(movie_root: &Path, revision: Revision) -> StoreResult<Manifest> {
    let path = paths::manifest_path(movie_root, revision);
    let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Loads the current manifest, i.e. the one `current.json` points at.
pub fn load_current_manifest(movie_root: &Path, movie_id: &str) -> StoreResult<Manifest> {
    match load_current(movie_root)? {
        Some(pointer) => load_manifest(movie_root, pointer.revision),
        None => Err(StoreError::NoCurrentManifest {
            movie_id: movie_id.to_string(),
        }),
    }
}

/// Persists `manifest`, then atomically advances `current.json` to point at
/// it — but only if `previous_hash` matches the hash currently recorded in
/// `current.json` (or both are absent, for the very first save). A mismatch
/// means another writer raced us; the caller must reload and retry.
pub fn save_manifest(
    movie_root: &Path,
    manifest: &Manifest,
    previous_hash: Option<&str>,
) -> StoreResult<String> {
    let existing = load_current(movie_root)?;
    match (&existing, previous_hash) {
        (Some(pointer), Some(expected)) if pointer.hash != expected => {
            return Err(StoreError::ManifestConflict {
                expected: expected.to_string(),
                actual: pointer.hash.clone(),
            });
        }
        (Some(pointer), None) => {
            return Err(StoreError::ManifestConflict {
                expected: "<none>".to_string(),
                actual: pointer.hash.clone(),
            });
        }
        (None, Some(expected)) => {
            return Err(StoreError::ManifestConflict {
                expected: expected.to_string(),
                actual: "<none>".to_string(),
            });
        }
        _ => {}
    }

    let hash = manifest
        .content_hash()
        .map_err(|source| StoreError::Json {
            path: "manifest".to_string(),
            source,
        })?;

    let manifests_dir = paths::manifests_dir(movie_root);
    std::fs::create_dir_all(&manifests_dir).map_err(|source| StoreError::Write {
        path: manifests_dir.display().to_string(),
        source,
    })?;
    let manifest_path = paths::manifest_path(movie_root, manifest.revision);
    atomic_write_json(&manifest_path, manifest)?;

    let pointer = CurrentPointer {
        revision: manifest.revision,
        manifest_path: manifest_path
            .strip_prefix(movie_root)
            .unwrap_or(&manifest_path)
            .display()
            .to_string(),
        hash: hash.clone(),
        updated_at: Utc::now(),
    };
    atomic_write_json(&paths::current_json_path(movie_root), &pointer)?;

    Ok(hash)
}

fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &json).map_err(|source| StoreError::Write {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}
