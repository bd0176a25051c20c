//! Bidirectional local <-> remote identifier map.
//!
//! [`IdentifierMap`] is built once per run, either restored from the
//! persisted cache or fetched fresh from a [`StudentSource`], and is
//! read-only afterwards.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::cache::{CacheKey, CacheLookup, IdentifierCache};
use crate::errors::IdentityError;
use crate::models::{LocalId, RemoteId, StudentRecord};
use crate::sources::StudentSource;

/// A bijection between local ids and remote ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    by_local: HashMap<LocalId, RemoteId>,
    by_remote: HashMap<RemoteId, LocalId>,
}

impl IdentifierMap {
    /// Build a map from (local, remote) pairs.
    ///
    /// Fails on the first id that appears twice on either side, including an
    /// identical pair repeated.
    pub fn from_records<I>(records: I) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = StudentRecord>,
    {
        let mut map = Self::default();

        for StudentRecord { local_id, remote_id } in records {
            if let Some(&first) = map.by_local.get(&local_id) {
                return Err(IdentityError::DuplicateLocalId {
                    local_id,
                    first,
                    second: remote_id,
                });
            }
            if let Some(first) = map.by_remote.get(&remote_id) {
                return Err(IdentityError::DuplicateRemoteId {
                    remote_id,
                    first: first.clone(),
                    second: local_id,
                });
            }
            map.by_remote.insert(remote_id, local_id.clone());
            map.by_local.insert(local_id, remote_id);
        }

        debug!(count = map.len(), "built identifier map");
        Ok(map)
    }

    /// Restore the map from `cache`, falling back to `students` on a miss.
    ///
    /// A freshly fetched map is persisted for the next run. Persist failures
    /// are logged and otherwise ignored.
    pub async fn build(
        cache: &dyn IdentifierCache,
        key: &CacheKey,
        students: &dyn StudentSource,
    ) -> Result<Self, IdentityError> {
        match cache.restore(key) {
            CacheLookup::Found(map) => {
                info!(count = map.len(), course_id = key.course_id, "restored student id mapping");
                Ok(map)
            }
            CacheLookup::Missing(reason) => {
                warn!(%reason, "unable to restore student id mapping");
                Self::refresh(cache, key, students).await
            }
        }
    }

    /// Fetch the authoritative pairs from `students` and persist them,
    /// bypassing any cached snapshot.
    pub async fn refresh(
        cache: &dyn IdentifierCache,
        key: &CacheKey,
        students: &dyn StudentSource,
    ) -> Result<Self, IdentityError> {
        info!(course_id = key.course_id, "fetching students");
        let records = students.fetch_all(key.course_id).await?;
        let map = Self::from_records(records)?;
        info!(count = map.len(), "fetched student id mapping");

        if let Err(e) = cache.persist(key, &map) {
            warn!(error = %e, "failed to cache student id mapping");
        }

        Ok(map)
    }

    /// Translate a local id into the platform's id.
    pub fn lookup_remote(&self, local_id: &LocalId) -> Option<RemoteId> {
        self.by_local.get(local_id).copied()
    }

    /// Translate a platform id back into the local id.
    pub fn lookup_local(&self, remote_id: RemoteId) -> Option<&LocalId> {
        self.by_remote.get(&remote_id)
    }

    pub fn len(&self) -> usize {
        self.by_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_local.is_empty()
    }

    /// All pairs, sorted by local id.
    pub fn records(&self) -> Vec<StudentRecord> {
        let mut records: Vec<_> = self
            .by_local
            .iter()
            .map(|(local_id, &remote_id)| StudentRecord {
                local_id: local_id.clone(),
                remote_id,
            })
            .collect();
        records.sort();
        records
    }
}
