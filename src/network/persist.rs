//! Snapshot Persistence
//!
//! The whole store is written as one snapshot: accounts, sessions, ranking
//! buckets and queue entries. Loaded once at startup, saved periodically and
//! at shutdown. Writes go to a sibling temp file and are renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use crate::network::matchmaking::QueueEntry;
use crate::network::ranking::RankingBucket;
use crate::network::session::MatchSession;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot bincode is invalid: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown snapshot format '{0}'")]
    UnknownFormat(String),

    #[error("snapshot store lock poisoned")]
    Poisoned,
}

/// Everything the store needs to come back after a restart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Nick → password digest.
    pub accounts: BTreeMap<String, String>,
    pub sessions: Vec<MatchSession>,
    pub rankings: Vec<RankingBucket>,
    pub queue: Vec<QueueEntry>,
}

impl Snapshot {
    /// Empty snapshot stamped `saved_at`.
    pub fn empty(saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            accounts: BTreeMap::new(),
            sessions: Vec::new(),
            rankings: Vec::new(),
            queue: Vec::new(),
        }
    }
}

/// On-disk encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Json,
    Bincode,
}

impl SnapshotFormat {
    /// Parse `json` / `bincode`.
    pub fn parse(s: &str) -> Result<Self, PersistError> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "bincode" => Ok(SnapshotFormat::Bincode),
            other => Err(PersistError::UnknownFormat(other.to_string())),
        }
    }

    /// Encode a snapshot.
    pub fn encode(self, snapshot: &Snapshot) -> Result<Vec<u8>, PersistError> {
        Ok(match self {
            SnapshotFormat::Json => serde_json::to_vec_pretty(snapshot)?,
            SnapshotFormat::Bincode => bincode::serialize(snapshot)?,
        })
    }

    /// Decode and version-check a snapshot.
    pub fn decode(self, bytes: &[u8]) -> Result<Snapshot, PersistError> {
        let snapshot: Snapshot = match self {
            SnapshotFormat::Json => serde_json::from_slice(bytes)?,
            SnapshotFormat::Bincode => bincode::deserialize(bytes)?,
        };
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}

/// Opaque load/save collaborator.
pub trait SnapshotStore: Send + Sync {
    /// Last saved snapshot, `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Snapshot>, PersistError>;

    /// Replace the saved snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError>;
}

/// Snapshot file on local disk.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    format: SnapshotFormat,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self { path: path.into(), format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = self.format.decode(&bytes)?;
        info!(
            path = %self.path.display(),
            sessions = snapshot.sessions.len(),
            accounts = snapshot.accounts.len(),
            "snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let bytes = self.format.encode(snapshot)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store, for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    format: SnapshotFormat,
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new(format: SnapshotFormat) -> Self {
        Self { format, bytes: Mutex::new(None) }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        let guard = self.bytes.lock().map_err(|_| PersistError::Poisoned)?;
        guard.as_deref().map(|b| self.format.decode(b)).transpose()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let bytes = self.format.encode(snapshot)?;
        let mut guard = self.bytes.lock().map_err(|_| PersistError::Poisoned)?;
        *guard = Some(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tab-persist-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_missing_file_loads_none() {
        let store = FileSnapshotStore::new(temp_file("none.json"), SnapshotFormat::Json);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_roundtrip_both_formats() {
        for format in [SnapshotFormat::Json, SnapshotFormat::Bincode] {
            let path = temp_file("snap.bin");
            let store = FileSnapshotStore::new(&path, format);

            let mut snap = Snapshot::empty(Utc::now());
            snap.accounts.insert("ana".into(), "digest".into());
            store.save(&snap).unwrap();

            let back = store.load().unwrap().unwrap();
            assert_eq!(back.accounts, snap.accounts);
            assert!(!store.temp_path().exists());
            let _ = fs::remove_dir_all(path.parent().unwrap());
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut snap = Snapshot::empty(Utc::now());
        snap.version = 99;
        let bytes = SnapshotFormat::Json.encode(&snap).unwrap();
        assert!(matches!(
            SnapshotFormat::Json.decode(&bytes),
            Err(PersistError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(SnapshotFormat::parse("JSON").unwrap(), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::parse("bincode").unwrap(), SnapshotFormat::Bincode);
        assert!(SnapshotFormat::parse("yaml").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySnapshotStore::new(SnapshotFormat::Bincode);
        assert!(store.load().unwrap().is_none());
        store.save(&Snapshot::empty(Utc::now())).unwrap();
        assert_eq!(store.load().unwrap().unwrap().version, SNAPSHOT_VERSION);
    }
}
