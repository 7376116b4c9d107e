//! `MovieStore`: the facade the planning and execution crates depend on,
//! bundling the blob store, the two event logs, and manifest/plan
//! persistence for one movie.

use std::path::{Path, PathBuf};

use crucible_types::{ArtefactEvent, CurrentPointer, ExecutionPlan, InputEvent, Manifest, Revision};

use crate::blobstore::{BlobStore, InMemoryBlobStore, LocalBlobStore};
use crate::error::{StoreError, StoreResult};
use crate::eventlog::EventLog;
use crate::manifest_store;
use crate::paths;

/// Everything a movie's planning/execution pipeline needs from persistence.
pub trait MovieStore: Send + Sync {
    fn movie_id(&self) -> &str;

    fn blobs(&self) -> &dyn BlobStore;

    fn append_input_event(&self, event: &InputEvent) -> StoreResult<()>;
    fn read_input_events(&self) -> StoreResult<Vec<InputEvent>>;

    fn append_artefact_event(&self, event: &ArtefactEvent) -> StoreResult<()>;
    fn read_artefact_events(&self) -> StoreResult<Vec<ArtefactEvent>>;

    fn load_current(&self) -> StoreResult<Option<CurrentPointer>>;
    fn load_manifest(&self, revision: Revision) -> StoreResult<Manifest>;
    fn load_current_manifest(&self) -> StoreResult<Manifest>;
    fn save_manifest(&self, manifest: &Manifest, previous_hash: Option<&str>) -> StoreResult<String>;

    fn save_plan(&self, plan: &ExecutionPlan) -> StoreResult<()>;
    fn load_plan(&self, revision: Revision) -> StoreResult<ExecutionPlan>;
}

/// Filesystem-backed `MovieStore` rooted at `<storage_root>/<movie_id>`.
pub struct FileMovieStore {
    movie_id: String,
    movie_root: PathBuf,
    blobs: LocalBlobStore,
    input_log: EventLog<InputEvent>,
    artefact_log: EventLog<ArtefactEvent>,
}

impl FileMovieStore {
    pub fn new(storage_root: impl AsRef<Path>, movie_id: impl Into<String>) -> Self {
        let movie_id = movie_id.into();
        let movie_root = paths::movie_root(storage_root.as_ref(), &movie_id);
        let blobs = LocalBlobStore::new(&movie_root);
        let input_log = EventLog::new(paths::inputs_log_path(&movie_root));
        let artefact_log = EventLog::new(paths::artefacts_log_path(&movie_root));
        Self {
            movie_id,
            movie_root,
            blobs,
            input_log,
            artefact_log,
        }
    }

    pub fn movie_root(&self) -> &Path {
        &self.movie_root
    }
}

impl MovieStore for FileMovieStore {
    fn movie_id(&self) -> &str {
        &self.movie_id
    }

    fn blobs(&self) -> &dyn BlobStore {
        &self.blobs
    }

    fn append_input_event(&self, event: &InputEvent) -> StoreResult<()> {
        self.input_log.append(event)
    }

    fn read_input_events(&self) -> StoreResult<Vec<InputEvent>> {
        self.input_log.read_all()
    }

    fn append_artefact_event(&self, event: &ArtefactEvent) -> StoreResult<()> {
        self.artefact_log.append(event)
    }

    fn read_artefact_events(&self) -> StoreResult<Vec<ArtefactEvent>> {
        self.artefact_log.read_all()
    }

    fn load_current(&self) -> StoreResult<Option<CurrentPointer>> {
        manifest_store::load_current(&self.movie_root)
    }

    fn load_manifest(&self, revision: Revision) -> StoreResult<Manifest> {
        manifest_store::load_manifest(&self.movie_root, revision)
    }

    fn load_current_manifest(&self) -> StoreResult<Manifest> {
        manifest_store::load_current_manifest(&self.movie_root, &self.movie_id)
    }

    fn save_manifest(&self, manifest: &Manifest, previous_hash: Option<&str>) -> StoreResult<String> {
        manifest_store::save_manifest(&self.movie_root, manifest, previous_hash)
    }

    fn save_plan(&self, plan: &ExecutionPlan) -> StoreResult<()> {
        let path = paths::plan_path(&self.movie_root, plan.revision);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let json = serde_json::to_vec_pretty(plan).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    fn load_plan(&self, revision: Revision) -> StoreResult<ExecutionPlan> {
        let path = paths::plan_path(&self.movie_root, revision);
        let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}

/// In-memory `MovieStore` used by planning/runner unit tests and the
/// simulated end-to-end scenarios; never persists to disk.
pub struct InMemoryMovieStore {
    movie_id: String,
    blobs: InMemoryBlobStore,
    input_events: std::sync::Mutex<Vec<InputEvent>>,
    artefact_events: std::sync::Mutex<Vec<ArtefactEvent>>,
    manifests: std::sync::Mutex<std::collections::BTreeMap<Revision, Manifest>>,
    plans: std::sync::Mutex<std::collections::BTreeMap<Revision, ExecutionPlan>>,
    current: std::sync::Mutex<Option<CurrentPointer>>,
}

impl InMemoryMovieStore {
    pub fn new(movie_id: impl Into<String>) -> Self {
        Self {
            movie_id: movie_id.into(),
            blobs: InMemoryBlobStore::new(),
            input_events: std::sync::Mutex::new(Vec::new()),
            artefact_events: std::sync::Mutex::new(Vec::new()),
            manifests: std::sync::Mutex::new(std::collections::BTreeMap::new()),
            plans: std::sync::Mutex::new(std::collections::BTreeMap::new()),
            current: std::sync::Mutex::new(None),
        }
    }
}

impl MovieStore for InMemoryMovieStore {
    fn movie_id(&self) -> &str {
        &self.movie_id
    }

    fn blobs(&self) -> &dyn BlobStore {
        &self.blobs
    }

    fn append_input_event(&self, event: &InputEvent) -> StoreResult<()> {
        self.input_events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn read_input_events(&self) -> StoreResult<Vec<InputEvent>> {
        Ok(self.input_events.lock().unwrap().clone())
    }

    fn append_artefact_event(&self, event: &ArtefactEvent) -> StoreResult<()> {
        self.artefact_events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn read_artefact_events(&self) -> StoreResult<Vec<ArtefactEvent>> {
        Ok(self.artefact_events.lock().unwrap().clone())
    }

    fn load_current(&self) -> StoreResult<Option<CurrentPointer>> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn load_manifest(&self, revision: Revision) -> StoreResult<Manifest> {
        self.manifests
            .lock()
            .unwrap()
            .get(&revision)
            .cloned()
            .ok_or_else(|| StoreError::NoCurrentManifest {
                movie_id: self.movie_id.clone(),
            })
    }

    fn load_current_manifest(&self) -> StoreResult<Manifest> {
        let current = self.load_current()?.ok_or_else(|| StoreError::NoCurrentManifest {
            movie_id: self.movie_id.clone(),
        })?;
        self.load_manifest(current.revision)
    }

    fn save_manifest(&self, manifest: &Manifest, previous_hash: Option<&str>) -> StoreResult<String> {
        let mut current = self.current.lock().unwrap();
        match (&*current, previous_hash) {
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
        self.manifests
            .lock()
            .unwrap()
            .insert(manifest.revision, manifest.clone());
        *current = Some(CurrentPointer {
            revision: manifest.revision,
            manifest_path: format!("manifests/{}.json", manifest.revision),
            hash: hash.clone(),
            updated_at: chrono::Utc::now(),
        });
        Ok(hash)
    }

    fn save_plan(&self, plan: &ExecutionPlan) -> StoreResult<()> {
        self.plans.lock().unwrap().insert(plan.revision, plan.clone());
        Ok(())
    }

    fn load_plan(&self, revision: Revision) -> StoreResult<ExecutionPlan> {
        self.plans
            .lock()
            .unwrap()
            .get(&revision)
            .cloned()
            .ok_or_else(|| StoreError::NoCurrentManifest {
                movie_id: self.movie_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_input_events() {
        let dir = tempdir().unwrap();
        let store = FileMovieStore::new(dir.path(), "movie-1");
        let event = InputEvent {
            id: crucible_types::InputId::from_name("Theme").unwrap(),
            revision: 0,
            hash: "h".into(),
            payload: crucible_types::InputPayload::Value(serde_json::json!("sunset")),
            edited_by: crucible_types::EditedBy::User,
            created_at: chrono::Utc::now(),
        };
        store.append_input_event(&event).unwrap();
        let all = store.read_input_events().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, event.id);
    }

    #[test]
    fn in_memory_store_round_trips_manifest() {
        let store = InMemoryMovieStore::new("movie-1");
        let manifest = Manifest::empty(Revision(0));
        let hash = store.save_manifest(&manifest, None).unwrap();
        let loaded = store.load_current_manifest().unwrap();
        assert_eq!(loaded.revision, Revision(0));
        assert!(!hash.is_empty());
    }
}
