//! Collaborator contracts consumed by the reconciliation core.
//!
//! The engine never talks to Canvas or the filesystem directly; it is handed
//! data produced through these traits. [`crate::canvas::CanvasClient`] and
//! [`crate::groups::GroupSpecFile`] are the production implementations.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::errors::{ConfigError, SourceError};
use crate::models::{GroupSpec, ListedGroup, RemoteId, StudentRecord};

/// Authoritative source of (local, remote) student id pairs.
#[async_trait]
pub trait StudentSource: Send + Sync {
    async fn fetch_all(&self, course_id: u64) -> Result<Vec<StudentRecord>, SourceError>;
}

/// Source of remote groups and their memberships.
#[async_trait]
pub trait GroupSource: Send + Sync {
    /// Groups in one group category of a course.
    ///
    /// A listing without `member_ids` is completed by the catalog through
    /// [`GroupSource::fetch_group_members`].
    async fn fetch_groups_by_category(
        &self,
        course_id: u64,
        category_id: u64,
    ) -> Result<Vec<ListedGroup>, SourceError>;

    async fn fetch_group_members(&self, group_id: RemoteId)
        -> Result<BTreeSet<RemoteId>, SourceError>;
}

/// Static source of locally authored group definitions.
pub trait ConfigSource {
    fn read_group_specs(&self) -> Result<Vec<GroupSpec>, ConfigError>;
}
