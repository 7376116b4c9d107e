//! The compacted latest-state view over the event logs for one revision.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blob::BlobRef;
use crate::events::ArtifactStatus;

/// A monotonically increasing identifier per movie (`rev-0000`, `rev-0001`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rev-{:04}", self.0)
    }
}

/// Compacted record of an input's latest state at manifest build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestInputEntry {
    pub hash: String,
    pub payload_digest: String,
    pub created_at: DateTime<Utc>,
}

/// Compacted record of an artifact's latest state at manifest build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestArtifactEntry {
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<BlobRef>,
    pub produced_by: String,
    pub status: ArtifactStatus,
    pub created_at: DateTime<Utc>,
}

/// Run configuration recorded into a manifest purely for observability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_to_layer: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_run_from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_artifact_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// The compacted latest-state view over both event logs. Derived state — the
/// event logs remain the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub revision: Revision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_revision: Option<Revision>,
    pub created_at: DateTime<Utc>,
    pub inputs: BTreeMap<String, ManifestInputEntry>,
    pub artefacts: BTreeMap<String, ManifestArtifactEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_config: Option<RunConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

impl Manifest {
    pub fn empty(revision: Revision) -> Self {
        Self {
            revision,
            base_revision: None,
            created_at: Utc::now(),
            inputs: BTreeMap::new(),
            artefacts: BTreeMap::new(),
            run_config: None,
            timeline: None,
        }
    }

    /// Canonical hash of this manifest, used for the `current.json`
    /// optimistic-concurrency check in `saveManifest`.
    pub fn content_hash(&self) -> serde_json::Result<String> {
        crate::canon::canonical_hash_of(self)
    }
}

/// `current.json` contents: a pointer to the latest persisted manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPointer {
    pub revision: Revision,
    pub manifest_path: String,
    pub hash: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_display_is_zero_padded() {
        assert_eq!(Revision(0).to_string(), "rev-0000");
        assert_eq!(Revision(42).to_string(), "rev-0042");
    }

    #[test]
    fn revision_next_increments() {
        assert_eq!(Revision(3).next(), Revision(4));
    }

    #[test]
    fn empty_manifest_hash_is_deterministic() {
        let m1 = Manifest::empty(Revision(0));
        let mut m2 = m1.clone();
        m2.created_at = m1.created_at;
        assert_eq!(m1.content_hash().unwrap(), m2.content_hash().unwrap());
    }
}
