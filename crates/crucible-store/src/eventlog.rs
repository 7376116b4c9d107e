//! Append-only JSONL event logs for inputs and artefacts.
//!
//! Mirrors the teacher's `EventLog`: an in-memory buffer plus a
//! file-append writer, except a malformed line on read is skipped rather
//! than treated as a parse error — §6 requires the engine to write only
//! well-formed lines but tolerate a reader encountering a corrupted one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// A single-writer, append-only JSONL log over records of type `T`.
pub struct EventLog<T> {
    path: std::path::PathBuf,
    lock: Mutex<()>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> EventLog<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single JSON line. Atomic with respect to the
    /// log file: either the full line plus newline lands, or nothing does.
    pub fn append(&self, record: &T) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let line = serde_json::to_string(record).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
        let mut writer = std::io::BufWriter::new(file);
        writeln!(writer, "{line}").map_err(|source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        writer.flush().map_err(|source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Reads every well-formed record in append order. Malformed lines are
    /// skipped with a warning; a missing file reads as empty.
    pub fn read_all(&self) -> StoreResult<Vec<T>> {
        let _guard = self.lock.lock().unwrap();
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(|source| StoreError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| StoreError::Read {
                path: self.path.display().to_string(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        error = %err,
                        "skipping malformed event log line"
                    );
                }
            }
        }
        Ok(records)
    }
}

/// Compacts an ordered list of events into latest-event-wins state, keyed
/// by `key_fn`. Later entries in iteration order win ties.
pub fn compact_latest_wins<T, K, F>(events: Vec<T>, key_fn: F) -> std::collections::BTreeMap<K, T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut out = std::collections::BTreeMap::new();
    for event in events {
        let key = key_fn(&event);
        out.insert(key, event);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        value: u32,
    }

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempdir().unwrap();
        let log = EventLog::<Sample>::new(dir.path().join("events/inputs.log"));
        log.append(&Sample {
            id: "a".into(),
            value: 1,
        })
        .unwrap();
        log.append(&Sample {
            id: "a".into(),
            value: 2,
        })
        .unwrap();
        let all = log.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].value, 2);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let log = EventLog::<Sample>::new(dir.path().join("events/inputs.log"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events/inputs.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"id\":\"a\",\"value\":1}\nnot json\n{\"id\":\"b\",\"value\":2}\n").unwrap();
        let log = EventLog::<Sample>::new(path);
        let all = log.read_all().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn compaction_keeps_last_write_per_key() {
        let events = vec![
            Sample {
                id: "a".into(),
                value: 1,
            },
            Sample {
                id: "a".into(),
                value: 2,
            },
            Sample {
                id: "b".into(),
                value: 9,
            },
        ];
        let compacted = compact_latest_wins(events, |e| e.id.clone());
        assert_eq!(compacted.get("a").unwrap().value, 2);
        assert_eq!(compacted.get("b").unwrap().value, 9);
    }
}
