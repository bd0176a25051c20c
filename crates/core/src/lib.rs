//! Groupsync core library.
//!
//! Compares the groups described in a local JSON file with the groups that
//! currently exist in a Canvas course, and reports name mismatches, missing
//! members and extraneous members. Nothing on Canvas is modified.
//!
//! A run builds a [`ReconciliationContext`] once (student id map from the
//! cache or Canvas, plus the group catalog) and hands it to the
//! [`ReconciliationEngine`], whose report is rendered by a
//! [`reporter::Reporter`].

pub mod canvas;
pub mod config;
pub mod errors;
pub mod groups;
pub mod identity;
pub mod models;
pub mod reconcile;
pub mod reporter;
pub mod sources;

// Re-exports for convenience.
pub use config::AppConfig;
pub use groups::{GroupCatalog, GroupSpecFile};
pub use identity::{IdentifierMap, JsonFileCache};
pub use reconcile::{ReconciliationContext, ReconciliationEngine, ReconciliationReport};
