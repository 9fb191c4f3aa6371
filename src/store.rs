//! Single-record snapshot persistence.
//!
//! One JSON blob under one fixed path, fully overwritten on every save.
//! No history, no versioning. Save and load failures are logged and
//! swallowed; nothing here ever surfaces to the user.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::snapshot::{Snapshot, Source};

pub const RECORD_FILE: &str = "snapshot.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot plus capture metadata: the snapshot's parts sit at the top
/// level of the record alongside an epoch-millisecond timestamp and a
/// source tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub timestamp: i64,
    pub source: Source,
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            path: default_path(),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist the snapshot, overwriting any prior record. Never fails the
    /// caller: disk and serialization errors end in a log line.
    pub fn save(&self, snapshot: &Snapshot, source: Source) {
        let record = PersistedRecord {
            snapshot: snapshot.clone(),
            timestamp: Utc::now().timestamp_millis(),
            source,
        };
        match self.write_record(&record) {
            Ok(()) => info!("snapshot persisted to {}", self.path.display()),
            Err(err) => warn!("failed to persist snapshot: {err}"),
        }
    }

    /// Read the prior record if one exists. The result is informational
    /// only; it is never merged back into the live snapshot.
    pub fn load_prior(&self) -> Option<PersistedRecord> {
        match self.read_record() {
            Ok(record) => record,
            Err(err) => {
                warn!("failed to load saved snapshot: {err}");
                None
            }
        }
    }

    /// Remove the persisted record. Missing-file is not an error.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("saved snapshot cleared"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to clear saved snapshot: {err}"),
        }
    }

    fn write_record(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let bytes = serde_json::to_vec_pretty(record)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if self.path.exists() {
                    fs::remove_file(&self.path)?;
                    fs::rename(&tmp_path, &self.path)?;
                    Ok(())
                } else {
                    Err(rename_err.into())
                }
            }
        }
    }

    fn read_record(&self) -> Result<Option<PersistedRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tgview")
        .join(RECORD_FILE)
}

/// User-triggered export of the current snapshot to a standalone file.
pub fn export_snapshot(
    snapshot: &Snapshot,
    dir: &Path,
    now_ms: i64,
) -> Result<PathBuf, StoreError> {
    let path = dir.join(format!("telegram-data-{now_ms}.json"));
    fs::write(&path, serde_json::to_vec_pretty(snapshot)?)?;
    Ok(path)
}

pub fn export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
