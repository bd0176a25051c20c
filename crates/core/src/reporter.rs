//! Rendering of a [`ReconciliationReport`].
//!
//! Reporters only format; they never inspect Canvas or the filesystem.

use std::fmt::Write;

use crate::reconcile::{GroupOutcome, GroupReconciliationResult, ReconciliationReport};

/// Turns a report into text for an operator or another tool.
pub trait Reporter {
    fn render(&self, report: &ReconciliationReport) -> String;
}

/// Human-readable, line-oriented output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReporter {
    /// Also list groups that are already in sync.
    pub show_clean: bool,
}

impl Reporter for TextReporter {
    fn render(&self, report: &ReconciliationReport) -> String {
        let mut out = String::new();

        for outcome in &report.outcomes {
            if outcome.result.is_clean() && !self.show_clean {
                continue;
            }
            render_outcome(&mut out, outcome);
        }

        if !report.unreferenced_groups.is_empty() {
            out.push_str("Canvas groups not referenced by the configuration:\n");
            for group in &report.unreferenced_groups {
                let _ = writeln!(out, "  {} ({})", group.name, group.remote_id);
            }
        }

        let s = &report.summary;
        let _ = writeln!(
            out,
            "{} group(s): {} in sync, {} need changes, {} not created, {} orphaned",
            s.groups, s.clean, s.drifted, s.pending_creation, s.orphaned
        );
        out
    }
}

fn render_outcome(out: &mut String, outcome: &GroupOutcome) {
    let name = &outcome.name;
    match &outcome.result {
        GroupReconciliationResult::PendingCreation => {
            let _ = writeln!(out, "Group {name} does not exist yet.");
        }
        GroupReconciliationResult::OrphanedReference { remote_id } => {
            let _ = writeln!(
                out,
                "Group {name} has id {remote_id}, which does not exist on Canvas."
            );
        }
        GroupReconciliationResult::Matched(diff) => {
            let id = outcome
                .remote_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            let _ = writeln!(out, "Group {name} exists as group {id} on Canvas.");

            if let Some(mismatch) = &diff.name_mismatch {
                let _ = writeln!(
                    out,
                    "  Name needs to be changed from {} to {}",
                    mismatch.remote, mismatch.local
                );
            }
            write_list(out, "Needs to be added", diff.to_add.iter());
            write_list(out, "Needs to be removed", diff.to_remove.iter());
            write_list(out, "Unknown student", diff.unresolved_local.iter());
            write_list(out, "Unknown Canvas user", diff.unresolved_remote.iter());
        }
    }
}

fn write_list<I, T>(out: &mut String, label: &str, items: I)
where
    I: Iterator<Item = T>,
    T: std::fmt::Display,
{
    for item in items {
        let _ = writeln!(out, "  {label}: {item}");
    }
}

/// Pretty-printed JSON of the whole report.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn render(&self, report: &ReconciliationReport) -> String {
        // The report is plain data with string keys; serialization cannot fail.
        serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }
}
