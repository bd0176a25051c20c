//! Per-group classification and membership diff.

use std::collections::BTreeSet;

use tracing::debug;

use super::report::{GroupOutcome, ReconciliationReport};
use super::{GroupReconciliationResult, MembershipDiff, NameMismatch, ReconciliationContext};
use crate::models::{GroupSpec, RemoteGroup};

/// Compares group specs against a [`ReconciliationContext`].
///
/// Holds only a shared borrow of the context, so one engine can be used
/// from several threads at once.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationEngine<'a> {
    ctx: &'a ReconciliationContext,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(ctx: &'a ReconciliationContext) -> Self {
        Self { ctx }
    }

    /// Classify a single spec.
    pub fn reconcile(&self, spec: &GroupSpec) -> GroupReconciliationResult {
        let Some(remote_id) = spec.remote_id else {
            debug!(group = %spec.name, "group has no remote id");
            return GroupReconciliationResult::PendingCreation;
        };

        match self.ctx.catalog.get(remote_id) {
            Some(remote) => GroupReconciliationResult::Matched(self.diff(spec, remote)),
            None => {
                debug!(group = %spec.name, %remote_id, "remote id not in catalog");
                GroupReconciliationResult::OrphanedReference { remote_id }
            }
        }
    }

    /// Classify every configured group, keeping input order.
    pub fn reconcile_all(&self, specs: &[GroupSpec]) -> ReconciliationReport {
        let outcomes = specs
            .iter()
            .map(|spec| GroupOutcome {
                name: spec.name.clone(),
                remote_id: spec.remote_id,
                result: self.reconcile(spec),
            })
            .collect();

        ReconciliationReport::new(outcomes, &self.ctx.catalog)
    }

    /// Compare membership in both directions; the two sides use disjoint id
    /// spaces, so each side is translated into the other before lookup.
    fn diff(&self, spec: &GroupSpec, remote: &RemoteGroup) -> MembershipDiff {
        let ids = &self.ctx.identifiers;

        let name_mismatch = (remote.name != spec.name).then(|| NameMismatch {
            remote: remote.name.clone(),
            local: spec.name.clone(),
        });

        let mut to_add = BTreeSet::new();
        let mut unresolved_local = BTreeSet::new();
        for local_id in &spec.members {
            match ids.lookup_remote(local_id) {
                None => {
                    unresolved_local.insert(local_id.clone());
                }
                Some(remote_id) if !remote.member_ids.contains(&remote_id) => {
                    to_add.insert(local_id.clone());
                }
                Some(_) => {}
            }
        }

        let mut to_remove = BTreeSet::new();
        let mut unresolved_remote = BTreeSet::new();
        for &remote_id in &remote.member_ids {
            match ids.lookup_local(remote_id) {
                None => {
                    unresolved_remote.insert(remote_id);
                }
                Some(local_id) if !spec.members.contains(local_id) => {
                    to_remove.insert(local_id.clone());
                }
                Some(_) => {}
            }
        }

        debug!(
            group = %spec.name,
            to_add = to_add.len(),
            to_remove = to_remove.len(),
            unresolved = unresolved_local.len() + unresolved_remote.len(),
            "computed membership diff"
        );

        MembershipDiff {
            name_mismatch,
            to_add,
            to_remove,
            unresolved_local,
            unresolved_remote,
        }
    }
}
