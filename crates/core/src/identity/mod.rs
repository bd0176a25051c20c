//! Student identifier mapping between the groups file and Canvas.
//!
//! The map is resolved in this order:
//! 1. Persisted JSON snapshot (if present, readable and for the same course)
//! 2. Fresh fetch from the student source, which is then persisted

pub mod cache;
pub mod map;

pub use cache::{CacheKey, CacheLookup, CacheMiss, IdentifierCache, JsonFileCache};
pub use map::IdentifierMap;
