//! Remote groups indexed by Canvas group id.

use std::collections::btree_map::{self, BTreeMap};

use tracing::{debug, info};

use crate::errors::CatalogError;
use crate::models::{RemoteGroup, RemoteId};
use crate::sources::GroupSource;

/// Read-only lookup of the remote groups in one group category.
///
/// Every group's `member_ids` is fully populated before the catalog is
/// handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCatalog {
    groups: BTreeMap<RemoteId, RemoteGroup>,
}

impl GroupCatalog {
    /// Build a catalog from already complete groups.
    pub fn from_groups<I>(groups: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = RemoteGroup>,
    {
        let mut catalog = Self::default();
        for group in groups {
            catalog.insert(group)?;
        }
        Ok(catalog)
    }

    /// Fetch the groups of `category_id` and the members of each one.
    pub async fn fetch(
        source: &dyn GroupSource,
        course_id: u64,
        category_id: u64,
    ) -> Result<Self, CatalogError> {
        info!(course_id, category_id, "fetching course groups");
        let listed = source.fetch_groups_by_category(course_id, category_id).await?;

        let mut catalog = Self::default();
        for mut group in listed {
            let members = match group.member_ids.take() {
                Some(members) => members,
                None => {
                    debug!(group_id = %group.remote_id, "fetching group members");
                    source.fetch_group_members(group.remote_id).await?
                }
            };
            catalog.insert(group.into_remote(members))?;
        }

        info!(count = catalog.len(), "fetched group catalog");
        Ok(catalog)
    }

    fn insert(&mut self, group: RemoteGroup) -> Result<(), CatalogError> {
        let id = group.remote_id;
        if self.groups.insert(id, group).is_some() {
            return Err(CatalogError::DuplicateGroup(id));
        }
        Ok(())
    }

    pub fn get(&self, remote_id: RemoteId) -> Option<&RemoteGroup> {
        self.groups.get(&remote_id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in ascending id order.
    pub fn iter(&self) -> btree_map::Values<'_, RemoteId, RemoteGroup> {
        self.groups.values()
    }
}
