//! Local group definitions and the remote group catalog.

pub mod catalog;
pub mod spec_file;

pub use catalog::GroupCatalog;
pub use spec_file::GroupSpecFile;
