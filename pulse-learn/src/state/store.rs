//! Versioned, single-writer file store for the learning state
//!
//! Runs follow load → compute → commit. A lock file keeps a second writer
//! out, and `commit` re-reads the on-disk version so a write that slipped
//! past the lock is refused instead of silently lost. Writes land in a temp
//! file next to the target and are renamed over it, so a crash mid-run
//! leaves the prior state intact.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LearnError, Result};

use super::learning::LearningState;

/// Locks older than this are assumed to belong to a crashed run
pub const STALE_LOCK_HOURS: i64 = 6;

/// Persisted form of the learning state
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u64,
    state: T,
}

/// Decode a state file into `(state, version)`.
///
/// A top-level `version` or `state` key means an envelope, and the envelope
/// must then parse in full. Only files with neither key are read as the bare
/// state written before versioning, at version 0.
fn parse_stored(content: &str) -> serde_json::Result<(LearningState, u64)> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let is_envelope = value
        .as_object()
        .is_some_and(|map| map.contains_key("version") || map.contains_key("state"));
    if is_envelope {
        let envelope: Envelope<LearningState> = serde_json::from_value(value)?;
        Ok((envelope.state, envelope.version))
    } else {
        Ok((serde_json::from_value(value)?, 0))
    }
}

/// State as loaded at the start of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: LearningState,
    /// Version the commit must still find on disk
    pub version: u64,
    /// Whether a readable state file existed
    pub existed: bool,
}

/// Held for the duration of a mutating run; removes the lock file on drop
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release state lock");
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// File-backed learning state store
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the single-writer lock
    pub fn lock(&self) -> Result<StateLock> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        match self.try_create_lock() {
            Ok(lock) => Ok(lock),
            Err(LearnError::Locked(_)) if self.lock_is_stale() => {
                warn!(path = %self.lock_path.display(), "Reclaiming stale state lock");
                fs::remove_file(&self.lock_path)?;
                self.try_create_lock()
            }
            Err(e) => Err(e),
        }
    }

    fn try_create_lock(&self) -> Result<StateLock> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(LearnError::Locked(self.lock_path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let lock = StateLock {
            path: self.lock_path.clone(),
        };
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        file.write_all(serde_json::to_string(&info)?.as_bytes())?;
        debug!(path = %self.lock_path.display(), "Acquired state lock");
        Ok(lock)
    }

    /// Age comes from the recorded `acquired_at`, or the file's mtime when
    /// the contents are unreadable (e.g. a run killed before writing them).
    fn lock_is_stale(&self) -> bool {
        let recorded = fs::read_to_string(&self.lock_path)
            .ok()
            .and_then(|content| serde_json::from_str::<LockInfo>(&content).ok());
        let acquired_at = match recorded {
            Some(info) => info.acquired_at,
            None => match fs::metadata(&self.lock_path).and_then(|meta| meta.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    debug!(path = %self.lock_path.display(), error = %e, "Cannot age state lock");
                    return false;
                }
            },
        };
        Utc::now() - acquired_at > Duration::hours(STALE_LOCK_HOURS)
    }

    /// Load the current state, falling back to an empty one.
    ///
    /// A missing file is a first run. An unparsable file is treated the same
    /// way (logged), which resets learning history.
    pub fn load(&self) -> Snapshot {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to read learning state");
                }
                return Snapshot {
                    state: LearningState::default(),
                    version: 0,
                    existed: false,
                };
            }
        };

        match parse_stored(&content) {
            Ok((state, version)) => Snapshot {
                state,
                version,
                existed: true,
            },
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Learning state is unreadable, starting from an empty state"
                );
                Snapshot {
                    state: LearningState::default(),
                    version: 0,
                    existed: false,
                }
            }
        }
    }

    /// Version currently on disk (0 when absent or unreadable)
    pub fn current_version(&self) -> u64 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| parse_stored(&content).ok())
            .map_or(0, |(_, version)| version)
    }

    /// Write `state` as version `expected + 1` if the disk still holds `expected`
    pub fn commit(&self, _lock: &StateLock, expected: u64, state: &LearningState) -> Result<u64> {
        let found = self.current_version();
        if found != expected {
            return Err(LearnError::Conflict { expected, found });
        }
        let version = expected + 1;
        write_json_atomic(&self.path, &Envelope { version, state })?;
        debug!(path = %self.path.display(), version, "Committed learning state");
        Ok(version)
    }
}

/// Read a JSON file, substituting the default when it is missing or malformed
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Malformed JSON, using defaults");
            T::default()
        }),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to read file, using defaults");
            }
            T::default()
        }
    }
}

/// Pretty-print `value` to a sibling temp file and rename it over `path`
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let content = serde_json::to_string_pretty(value)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LearnError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Arm, Dimension};
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> StateStore {
        StateStore::new(tmp.path().join("learning_state.json"))
    }

    fn sample_state() -> LearningState {
        let mut state = LearningState::default();
        let arm = Arm::new(Dimension::Approach, "listicle").unwrap();
        state.observe(&arm, 0.42, (0.3, 0.7));
        state.observe(&arm, 0.91, (0.3, 0.7));
        state.global_stats.record("p1", 120.5);
        state
    }

    #[test]
    fn test_load_missing_is_first_run() {
        let tmp = TempDir::new().unwrap();
        let snapshot = store_in(&tmp).load();
        assert!(!snapshot.existed);
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.state.is_empty());
    }

    #[test]
    fn test_commit_and_reload_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let state = sample_state();

        let lock = store.lock().unwrap();
        let version = store.commit(&lock, 0, &state).unwrap();
        drop(lock);
        assert_eq!(version, 1);

        let snapshot = store.load();
        assert!(snapshot.existed);
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.state, state);
    }

    #[test]
    fn test_commit_detects_conflict() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let lock = store.lock().unwrap();
        store.commit(&lock, 0, &sample_state()).unwrap();

        let err = store.commit(&lock, 0, &LearningState::default()).unwrap_err();
        assert!(matches!(
            err,
            LearnError::Conflict {
                expected: 0,
                found: 1
            }
        ));
        // The first write survived.
        assert_eq!(store.load().state, sample_state());
    }

    #[test]
    fn test_second_writer_is_locked_out() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let lock = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(LearnError::Locked(_))));
        drop(lock);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let info = LockInfo {
            pid: 1,
            acquired_at: Utc::now() - Duration::hours(STALE_LOCK_HOURS + 1),
        };
        fs::write(
            tmp.path().join("learning_state.lock"),
            serde_json::to_string(&info).unwrap(),
        )
        .unwrap();
        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_empty_lock_file_ages_by_mtime() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let lock_path = tmp.path().join("learning_state.lock");

        fs::write(&lock_path, "").unwrap();
        assert!(matches!(store.lock(), Err(LearnError::Locked(_))));

        let old = std::time::SystemTime::now()
            - std::time::Duration::from_secs((STALE_LOCK_HOURS as u64 + 1) * 3600);
        fs::File::options()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(old)
            .unwrap();
        let lock = store.lock().unwrap();
        let info: LockInfo = serde_json::from_str(&fs::read_to_string(&lock_path).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());
        drop(lock);
    }

    #[test]
    fn test_envelope_with_bad_arm_is_not_read_as_bare_state() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let body = serde_json::json!({
            "version": 4,
            "state": {
                "theme_scores": {
                    "career": {"alpha": 30.0, "beta": 19.7, "trials": 49},
                    "!!!": {"alpha": 1.3, "beta": 0.7, "trials": 1}
                },
                "global_stats": {"total_posts_analyzed": 50, "avg_reward": 0.4}
            }
        });
        fs::write(store.path(), body.to_string()).unwrap();

        let snapshot = store.load();
        assert!(!snapshot.existed);
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.state.is_empty());
        assert_eq!(store.current_version(), 0);
    }

    #[test]
    fn test_envelope_with_mistyped_shape_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(
            store.path(),
            r#"{"version": 2, "state": {"theme_scores": {"career": {"alpha": "x", "beta": 0.7}}}}"#,
        )
        .unwrap();
        assert!(!store.load().existed);

        // An envelope missing its version is not a bare state either.
        fs::write(store.path(), r#"{"state": {}}"#).unwrap();
        assert!(!store.load().existed);
    }

    #[test]
    fn test_corrupt_state_falls_back_to_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), "{ not json").unwrap();
        let snapshot = store.load();
        assert!(snapshot.state.is_empty());
        assert!(!snapshot.existed);
        assert_eq!(store.current_version(), 0);
    }

    #[test]
    fn test_bare_legacy_state_loads() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), serde_json::to_string(&sample_state()).unwrap()).unwrap();
        let snapshot = store.load();
        assert!(snapshot.existed);
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.state, sample_state());
    }

    #[test]
    fn test_load_json_or_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("list.json");
        let missing: Vec<u32> = load_json_or_default(&path);
        assert!(missing.is_empty());

        write_json_atomic(&path, &vec![1u32, 2, 3]).unwrap();
        let loaded: Vec<u32> = load_json_or_default(&path);
        assert_eq!(loaded, vec![1, 2, 3]);

        fs::write(&path, "[1, 2,").unwrap();
        let broken: Vec<u32> = load_json_or_default(&path);
        assert!(broken.is_empty());
    }
}
