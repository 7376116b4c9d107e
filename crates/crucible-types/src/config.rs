//! Layered runtime configuration: TOML defaults merged with explicit
//! overrides supplied by the embedding CLI/API.

use serde::{Deserialize, Serialize};

/// Every knob named across planning, execution, and storage, with TOML file
/// values acting as defaults and struct-level overrides always winning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Root directory movies are stored under.
    pub storage_root: String,
    /// Worker pool size used by the runner. 1 gives deterministic ordering,
    /// useful for tests; production runs typically set this higher.
    pub concurrency: usize,
    /// Default scope applied when a run omits explicit scope controls.
    pub up_to_layer: Option<usize>,
    pub re_run_from: Option<usize>,
    pub target_artifact_ids: Vec<String>,
    pub pinned_artifact_ids: Vec<String>,
    /// Environment label fed into the provider handler cache key.
    pub environment: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            storage_root: "movies".to_string(),
            concurrency: 1,
            up_to_layer: None,
            re_run_from: None,
            target_artifact_ids: Vec::new(),
            pinned_artifact_ids: Vec::new(),
            environment: "default".to_string(),
        }
    }
}

/// Errors surfaced while loading or merging runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl RuntimeConfig {
    /// Loads defaults from an optional TOML file, then applies `overrides`
    /// on top. A missing file is not an error — it simply means all
    /// defaults come from `RuntimeConfig::default()`.
    pub fn load(
        toml_path: Option<&std::path::Path>,
        overrides: RuntimeConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut cfg = match toml_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            _ => RuntimeConfig::default(),
        };
        overrides.apply(&mut cfg);
        Ok(cfg)
    }
}

/// Explicit overrides that always win over file-sourced defaults. Every
/// field is optional; `None` (or empty, for collections) leaves the
/// file/default value untouched.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigOverrides {
    pub storage_root: Option<String>,
    pub concurrency: Option<usize>,
    pub up_to_layer: Option<usize>,
    pub re_run_from: Option<usize>,
    pub target_artifact_ids: Option<Vec<String>>,
    pub pinned_artifact_ids: Option<Vec<String>>,
    pub environment: Option<String>,
}

impl RuntimeConfigOverrides {
    fn apply(self, cfg: &mut RuntimeConfig) {
        if let Some(v) = self.storage_root {
            cfg.storage_root = v;
        }
        if let Some(v) = self.concurrency {
            cfg.concurrency = v;
        }
        if self.up_to_layer.is_some() {
            cfg.up_to_layer = self.up_to_layer;
        }
        if self.re_run_from.is_some() {
            cfg.re_run_from = self.re_run_from;
        }
        if let Some(v) = self.target_artifact_ids {
            cfg.target_artifact_ids = v;
        }
        if let Some(v) = self.pinned_artifact_ids {
            cfg.pinned_artifact_ids = v;
        }
        if let Some(v) = self.environment {
            cfg.environment = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = RuntimeConfig::load(None, RuntimeConfigOverrides::default()).unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn overrides_win_over_defaults() {
        let cfg = RuntimeConfig::load(
            None,
            RuntimeConfigOverrides {
                concurrency: Some(8),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.storage_root, "movies");
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crucible.toml");
        std::fs::write(&path, "concurency = 8\n").unwrap();

        let err = RuntimeConfig::load(Some(&path), RuntimeConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
