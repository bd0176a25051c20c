//! Persisted snapshot of the student id mapping.
//!
//! The snapshot file format:
//!
//! ```json
//! {
//!   "course_id": 1234,
//!   "local_id_field": "login_id",
//!   "fetched_at": "2026-09-01T08:00:00Z",
//!   "students": [
//!     { "local_id": "jdoe", "remote_id": 5501 }
//!   ]
//! }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::map::IdentifierMap;
use crate::config::LocalIdField;
use crate::errors::CacheError;
use crate::models::StudentRecord;

/// Identifies which snapshot a run is allowed to reuse: same course and same
/// local id field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub course_id: u64,
    pub local_id_field: LocalIdField,
}

impl CacheKey {
    /// Key for `course_id` with the default local id field.
    pub const fn new(course_id: u64) -> Self {
        Self {
            course_id,
            local_id_field: LocalIdField::LoginId,
        }
    }

    pub fn with_local_id_field(mut self, field: LocalIdField) -> Self {
        self.local_id_field = field;
        self
    }
}

/// Why a snapshot could not be reused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheMiss {
    #[error("no cached mapping at '{0}'")]
    NotFound(PathBuf),

    #[error("cached mapping unreadable: {0}")]
    Unreadable(String),

    #[error("cached mapping is corrupt: {0}")]
    Corrupt(String),

    #[error("cached mapping belongs to course {found}, expected {expected}")]
    CourseMismatch { expected: u64, found: u64 },

    #[error("cached mapping is keyed by {found:?}, expected {expected:?}")]
    FieldMismatch {
        expected: LocalIdField,
        found: LocalIdField,
    },

    #[error("cached mapping fetched at {fetched_at} has expired")]
    Expired { fetched_at: DateTime<Utc> },
}

/// Outcome of [`IdentifierCache::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Found(IdentifierMap),
    Missing(CacheMiss),
}

/// Storage for identifier map snapshots.
pub trait IdentifierCache: Send + Sync {
    /// Load a previously persisted map. Any failure is a miss.
    fn restore(&self, key: &CacheKey) -> CacheLookup;

    /// Store `map` so a later run can restore it.
    fn persist(&self, key: &CacheKey, map: &IdentifierMap) -> Result<(), CacheError>;
}

/// On-disk snapshot layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    course_id: u64,
    #[serde(default)]
    local_id_field: LocalIdField,
    fetched_at: DateTime<Utc>,
    #[serde(default)]
    students: Vec<StudentRecord>,
}

/// JSON file backed [`IdentifierCache`].
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
    max_age: Option<Duration>,
}

impl JsonFileCache {
    /// Create a cache at `path` whose snapshots never expire.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: None,
        }
    }

    /// Treat snapshots older than `max_age` as missing.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<IdentifierMap, CacheMiss> {
        if !self.path.exists() {
            return Err(CacheMiss::NotFound(self.path.clone()));
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| CacheMiss::Unreadable(e.to_string()))?;
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;

        if snapshot.course_id != key.course_id {
            return Err(CacheMiss::CourseMismatch {
                expected: key.course_id,
                found: snapshot.course_id,
            });
        }

        if snapshot.local_id_field != key.local_id_field {
            return Err(CacheMiss::FieldMismatch {
                expected: key.local_id_field,
                found: snapshot.local_id_field,
            });
        }

        if let Some(max_age) = self.max_age {
            if now - snapshot.fetched_at > max_age {
                return Err(CacheMiss::Expired {
                    fetched_at: snapshot.fetched_at,
                });
            }
        }

        IdentifierMap::from_records(snapshot.students)
            .map_err(|e| CacheMiss::Corrupt(e.to_string()))
    }
}

impl IdentifierCache for JsonFileCache {
    fn restore(&self, key: &CacheKey) -> CacheLookup {
        debug!(path = %self.path.display(), "restoring student id mapping");
        match self.load(key, Utc::now()) {
            Ok(map) => CacheLookup::Found(map),
            Err(miss) => CacheLookup::Missing(miss),
        }
    }

    fn persist(&self, key: &CacheKey, map: &IdentifierMap) -> Result<(), CacheError> {
        info!(path = %self.path.display(), count = map.len(), "caching student id mapping");

        let snapshot = Snapshot {
            course_id: key.course_id,
            local_id_field: key.local_id_field,
            fetched_at: Utc::now(),
            students: map.records(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        // Write beside the target and rename so readers never see a partial file.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| CacheError::WriteFailed {
            path: self.path.clone(),
            detail: e.error.to_string(),
        })?;

        debug!("student id mapping cached");
        Ok(())
    }
}
