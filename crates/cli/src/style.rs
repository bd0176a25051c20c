//! Terminal styling for reconciliation output.

use comfy_table::{Cell, Color};
use console::Style;

use groupsync_core::reconcile::GroupReconciliationResult;

/// Green checkmark line.
pub fn success(msg: &str) -> String {
    format!("{} {}", Style::new().green().apply_to("✓"), msg)
}

/// Yellow warning line.
pub fn warn(msg: &str) -> String {
    format!("{} {}", Style::new().yellow().apply_to("⚠"), msg)
}

/// Bold heading.
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Status cell for the summary table.
pub fn outcome_cell(result: &GroupReconciliationResult) -> Cell {
    match result {
        r if r.is_clean() => Cell::new("✓ in sync").fg(Color::Green),
        GroupReconciliationResult::Matched(_) => Cell::new("● changes").fg(Color::Yellow),
        GroupReconciliationResult::PendingCreation => Cell::new("○ not created").fg(Color::Cyan),
        GroupReconciliationResult::OrphanedReference { .. } => {
            Cell::new("✗ orphaned").fg(Color::Red)
        }
    }
}

/// A count cell that is dimmed when zero.
pub fn count_cell(n: usize) -> Cell {
    if n == 0 {
        Cell::new("—").fg(Color::DarkGrey)
    } else {
        Cell::new(n)
    }
}
