//! Path layout for a movie's storage root.
//!
//! ```text
//! <root>/<movie_id>/
//!   current.json
//!   manifests/<revision>.json
//!   runs/<revision>-plan.json
//!   events/inputs.log
//!   events/artefacts.log
//!   blobs/<hh>/<hash>.<ext>
//!   inputs.yaml
//! ```

use std::path::{Path, PathBuf};

use crucible_types::Revision;

pub fn movie_root(storage_root: &Path, movie_id: &str) -> PathBuf {
    storage_root.join(movie_id)
}

pub fn current_json_path(movie_root: &Path) -> PathBuf {
    movie_root.join("current.json")
}

pub fn manifests_dir(movie_root: &Path) -> PathBuf {
    movie_root.join("manifests")
}

pub fn manifest_path(movie_root: &Path, revision: Revision) -> PathBuf {
    manifests_dir(movie_root).join(format!("{revision}.json"))
}

pub fn runs_dir(movie_root: &Path) -> PathBuf {
    movie_root.join("runs")
}

pub fn plan_path(movie_root: &Path, revision: Revision) -> PathBuf {
    runs_dir(movie_root).join(format!("{revision}-plan.json"))
}

pub fn events_dir(movie_root: &Path) -> PathBuf {
    movie_root.join("events")
}

pub fn inputs_log_path(movie_root: &Path) -> PathBuf {
    events_dir(movie_root).join("inputs.log")
}

pub fn artefacts_log_path(movie_root: &Path) -> PathBuf {
    events_dir(movie_root).join("artefacts.log")
}

pub fn blobs_dir(movie_root: &Path) -> PathBuf {
    movie_root.join("blobs")
}

pub fn blob_path(movie_root: &Path, relative: &str) -> PathBuf {
    movie_root.join(relative)
}

pub fn inputs_yaml_path(movie_root: &Path) -> PathBuf {
    movie_root.join("inputs.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_path_uses_revision_display() {
        let root = Path::new("/movies/m1");
        assert_eq!(
            manifest_path(root, Revision(7)),
            PathBuf::from("/movies/m1/manifests/rev-0007.json")
        );
    }

    #[test]
    fn plan_path_suffixes_revision() {
        let root = Path::new("/movies/m1");
        assert_eq!(
            plan_path(root, Revision(0)),
            PathBuf::from("/movies/m1/runs/rev-0000-plan.json")
        );
    }
}
