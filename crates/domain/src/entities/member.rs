//! Chat platform members and roles.

use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{MemberId, RoleId};

/// A member of a chat server as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
    pub roles: BTreeSet<RoleId>,
    pub bot: bool,
}

/// A role defined on a chat server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRole {
    pub id: RoleId,
    pub name: String,
}

/// Role name to role id for one server.
///
/// Platforms allow duplicate role names; the role with the lowest id wins so
/// that lookups are deterministic across fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDirectory {
    by_name: BTreeMap<String, RoleId>,
}

impl RoleDirectory {
    pub fn from_roles(roles: impl IntoIterator<Item = PlatformRole>) -> Self {
        let mut by_name: BTreeMap<String, RoleId> = BTreeMap::new();
        for role in roles {
            by_name
                .entry(role.name)
                .and_modify(|existing| {
                    if role.id < *existing {
                        *existing = role.id;
                    }
                })
                .or_insert(role.id);
        }
        Self { by_name }
    }

    /// Id of the role with exactly this name, if provisioned.
    pub fn resolve(&self, name: &str) -> Option<RoleId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
