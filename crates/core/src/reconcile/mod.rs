//! Reconciliation of local group definitions against the remote catalog.
//!
//! The engine is pure: it reads a [`ReconciliationContext`] built once per
//! run and returns one [`GroupReconciliationResult`] per [`GroupSpec`].
//! Rendering is left to [`crate::reporter`].
//!
//! [`GroupSpec`]: crate::models::GroupSpec

pub mod engine;
pub mod report;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::CoreError;
use crate::groups::GroupCatalog;
use crate::identity::{CacheKey, IdentifierCache, IdentifierMap};
use crate::models::{LocalId, RemoteId};
use crate::sources::{GroupSource, StudentSource};

pub use engine::ReconciliationEngine;
pub use report::{GroupOutcome, ReconciliationReport, ReportSummary, UnreferencedGroup};

/// Everything the engine reads, constructed before reconciliation starts.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationContext {
    pub identifiers: IdentifierMap,
    pub catalog: GroupCatalog,
}

impl ReconciliationContext {
    pub fn new(identifiers: IdentifierMap, catalog: GroupCatalog) -> Self {
        Self {
            identifiers,
            catalog,
        }
    }

    /// Build the identifier map (cache first) and fetch the group catalog.
    ///
    /// Any failure here aborts the run; nothing has been reconciled yet.
    pub async fn build(
        cache: &dyn IdentifierCache,
        students: &dyn StudentSource,
        groups: &dyn GroupSource,
        key: &CacheKey,
        category_id: u64,
    ) -> Result<Self, CoreError> {
        let identifiers = IdentifierMap::build(cache, key, students).await?;
        let catalog = GroupCatalog::fetch(groups, key.course_id, category_id).await?;
        info!(
            students = identifiers.len(),
            groups = catalog.len(),
            "reconciliation context ready"
        );
        Ok(Self::new(identifiers, catalog))
    }
}

/// The remote name differs from the configured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMismatch {
    pub remote: String,
    pub local: String,
}

/// Differences between a configured group and its remote counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDiff {
    pub name_mismatch: Option<NameMismatch>,
    /// Configured members missing remotely.
    pub to_add: BTreeSet<LocalId>,
    /// Remote members not in the configuration.
    pub to_remove: BTreeSet<LocalId>,
    /// Configured members with no known remote id.
    pub unresolved_local: BTreeSet<LocalId>,
    /// Remote members with no known local id.
    pub unresolved_remote: BTreeSet<RemoteId>,
}

impl MembershipDiff {
    /// True when the remote group already matches the configuration.
    pub fn is_clean(&self) -> bool {
        self.name_mismatch.is_none()
            && self.to_add.is_empty()
            && self.to_remove.is_empty()
            && self.unresolved_local.is_empty()
            && self.unresolved_remote.is_empty()
    }
}

/// Classification of one configured group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GroupReconciliationResult {
    /// The group exists remotely; the diff may be empty.
    Matched(MembershipDiff),
    /// No remote id configured yet.
    PendingCreation,
    /// The configured remote id is not in the catalog.
    OrphanedReference { remote_id: RemoteId },
}

impl GroupReconciliationResult {
    pub fn diff(&self) -> Option<&MembershipDiff> {
        match self {
            Self::Matched(diff) => Some(diff),
            _ => None,
        }
    }

    /// True only for a matched group with nothing to change.
    pub fn is_clean(&self) -> bool {
        self.diff().is_some_and(MembershipDiff::is_clean)
    }
}
