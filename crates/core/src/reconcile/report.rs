//! Aggregated results of one reconciliation run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::GroupReconciliationResult;
use crate::groups::GroupCatalog;
use crate::models::RemoteId;

/// Result for one configured group, tagged with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    pub result: GroupReconciliationResult,
}

/// A remote group in the category that no configured group refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreferencedGroup {
    pub remote_id: RemoteId,
    pub name: String,
}

/// Counts over a set of outcomes.
///
/// Built with [`ReportSummary::record`] and combined with
/// [`ReportSummary::merge`]; both are order independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub groups: usize,
    pub clean: usize,
    pub drifted: usize,
    pub pending_creation: usize,
    pub orphaned: usize,
    pub name_mismatches: usize,
    pub members_to_add: usize,
    pub members_to_remove: usize,
    pub unresolved_ids: usize,
}

impl ReportSummary {
    pub fn record(&mut self, result: &GroupReconciliationResult) {
        self.groups += 1;
        match result {
            GroupReconciliationResult::Matched(diff) => {
                if diff.is_clean() {
                    self.clean += 1;
                } else {
                    self.drifted += 1;
                }
                self.name_mismatches += usize::from(diff.name_mismatch.is_some());
                self.members_to_add += diff.to_add.len();
                self.members_to_remove += diff.to_remove.len();
                self.unresolved_ids += diff.unresolved_local.len() + diff.unresolved_remote.len();
            }
            GroupReconciliationResult::PendingCreation => self.pending_creation += 1,
            GroupReconciliationResult::OrphanedReference { .. } => self.orphaned += 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            groups: self.groups + other.groups,
            clean: self.clean + other.clean,
            drifted: self.drifted + other.drifted,
            pending_creation: self.pending_creation + other.pending_creation,
            orphaned: self.orphaned + other.orphaned,
            name_mismatches: self.name_mismatches + other.name_mismatches,
            members_to_add: self.members_to_add + other.members_to_add,
            members_to_remove: self.members_to_remove + other.members_to_remove,
            unresolved_ids: self.unresolved_ids + other.unresolved_ids,
        }
    }
}

impl<'a> FromIterator<&'a GroupReconciliationResult> for ReportSummary {
    fn from_iter<I: IntoIterator<Item = &'a GroupReconciliationResult>>(iter: I) -> Self {
        let mut summary = Self::default();
        for result in iter {
            summary.record(result);
        }
        summary
    }
}

/// One outcome per configured group, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub outcomes: Vec<GroupOutcome>,
    /// Catalog groups no outcome refers to, by ascending id.
    pub unreferenced_groups: Vec<UnreferencedGroup>,
    pub summary: ReportSummary,
}

impl ReconciliationReport {
    pub fn new(outcomes: Vec<GroupOutcome>, catalog: &GroupCatalog) -> Self {
        let referenced: BTreeSet<RemoteId> = outcomes.iter().filter_map(|o| o.remote_id).collect();
        let unreferenced_groups = catalog
            .iter()
            .filter(|g| !referenced.contains(&g.remote_id))
            .map(|g| UnreferencedGroup {
                remote_id: g.remote_id,
                name: g.name.clone(),
            })
            .collect();
        let summary = outcomes.iter().map(|o| &o.result).collect();

        Self {
            outcomes,
            unreferenced_groups,
            summary,
        }
    }

    /// True when every configured group exists remotely with nothing to change.
    pub fn is_in_sync(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_clean())
    }
}
