//! Domain model types shared by the identifier map, the group catalog and
//! the reconciliation engine.
//!
//! Two identifier spaces meet here: [`LocalId`] is what the groups file uses
//! to name a student, [`RemoteId`] is the number Canvas assigned to the same
//! student (or group).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier used by the local configuration (a student's login name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LocalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier assigned by the remote platform to a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(u64);

impl RemoteId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RemoteId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// One authoritative (local, remote) pair as reported by a student source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentRecord {
    pub local_id: LocalId,
    pub remote_id: RemoteId,
}

impl StudentRecord {
    pub fn new(local_id: impl Into<LocalId>, remote_id: impl Into<RemoteId>) -> Self {
        Self {
            local_id: local_id.into(),
            remote_id: remote_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A locally authored group definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Desired group name.
    pub name: String,

    /// Canvas group id, present once the group is believed to exist remotely.
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,

    /// Intended members, by local id.
    #[serde(default)]
    pub members: BTreeSet<LocalId>,
}

impl GroupSpec {
    pub fn new<I, S>(name: impl Into<String>, remote_id: Option<u64>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<LocalId>,
    {
        Self {
            name: name.into(),
            remote_id: remote_id.map(RemoteId::new),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// The platform's current record of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    pub remote_id: RemoteId,
    pub name: String,
    pub member_ids: BTreeSet<RemoteId>,
}

impl RemoteGroup {
    pub fn new<I>(remote_id: u64, name: impl Into<String>, member_ids: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        Self {
            remote_id: RemoteId::new(remote_id),
            name: name.into(),
            member_ids: member_ids.into_iter().map(RemoteId::new).collect(),
        }
    }
}

/// A group as listed by a group source, possibly without its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedGroup {
    pub remote_id: RemoteId,
    pub name: String,
    /// `None` when the listing did not include memberships.
    pub member_ids: Option<BTreeSet<RemoteId>>,
}

impl ListedGroup {
    pub fn without_members(remote_id: u64, name: impl Into<String>) -> Self {
        Self {
            remote_id: RemoteId::new(remote_id),
            name: name.into(),
            member_ids: None,
        }
    }

    pub fn into_remote(self, member_ids: BTreeSet<RemoteId>) -> RemoteGroup {
        RemoteGroup {
            remote_id: self.remote_id,
            name: self.name,
            member_ids,
        }
    }
}

impl From<RemoteGroup> for ListedGroup {
    fn from(group: RemoteGroup) -> Self {
        Self {
            remote_id: group.remote_id,
            name: group.name,
            member_ids: Some(group.member_ids),
        }
    }
}
