//! JSON groups file reader.
//!
//! The groups file format:
//!
//! ```json
//! {
//!   "groups": [
//!     { "name": "Team Alpha", "id": 10, "members": ["jdoe", "alice"] },
//!     { "name": "Team Beta", "members": ["bob"] }
//!   ]
//! }
//! ```
//!
//! A group without `id` has not been created on Canvas yet.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::models::GroupSpec;
use crate::sources::ConfigSource;

#[derive(Debug, Deserialize)]
struct GroupsFileData {
    #[serde(default)]
    groups: Vec<GroupSpec>,
}

/// [`ConfigSource`] backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct GroupSpecFile {
    path: PathBuf,
}

impl GroupSpecFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse group specs from JSON text.
    pub fn parse(contents: &str) -> Result<Vec<GroupSpec>, ConfigError> {
        let data: GroupsFileData =
            serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for (index, spec) in data.groups.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("groups[{index}].name"),
                    detail: "group name must not be empty".into(),
                });
            }
        }

        warn_on_shared_ids(&data.groups);
        Ok(data.groups)
    }
}

impl ConfigSource for GroupSpecFile {
    fn read_group_specs(&self) -> Result<Vec<GroupSpec>, ConfigError> {
        info!(path = %self.path.display(), "reading group definitions");

        if !self.path.exists() {
            return Err(ConfigError::FileNotFound(self.path.display().to_string()));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let specs = Self::parse(&contents)?;

        debug!(count = specs.len(), "loaded group definitions");
        Ok(specs)
    }
}

/// Two specs pointing at one Canvas group are both reconciled, but it is
/// almost always a copy-paste mistake.
fn warn_on_shared_ids(specs: &[GroupSpec]) {
    let mut seen: HashMap<_, &str> = HashMap::new();
    for spec in specs {
        if let Some(id) = spec.remote_id {
            if let Some(first) = seen.insert(id, &spec.name) {
                warn!(
                    remote_id = %id,
                    first,
                    second = %spec.name,
                    "two group definitions reference the same Canvas group"
                );
            }
        }
    }
}
