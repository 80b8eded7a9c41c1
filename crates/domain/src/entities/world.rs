//! Game worlds and the world directory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::WorldId;
use crate::value_objects::normalize_world_name;

/// A game world (server shard).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
}

impl World {
    /// Build a world from raw API data, normalizing the name.
    pub fn from_api(id: WorldId, raw_name: &str) -> Self {
        Self {
            id,
            name: normalize_world_name(raw_name),
        }
    }
}

/// Complete mapping from world id to (normalized) world name.
///
/// Built in one go from a bulk listing and never modified afterwards; a
/// directory is either fully loaded or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldDirectory {
    worlds: BTreeMap<WorldId, String>,
}

impl WorldDirectory {
    pub fn from_worlds(worlds: impl IntoIterator<Item = World>) -> Self {
        Self {
            worlds: worlds.into_iter().map(|w| (w.id, w.name)).collect(),
        }
    }

    /// Name of the world with the given id.
    pub fn name(&self, id: WorldId) -> Option<&str> {
        self.worlds.get(&id).map(String::as_str)
    }

    /// Every known world name, in world id order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.worlds.values().map(String::as_str)
    }

    /// Case-insensitive lookup by name, returning the canonical spelling.
    pub fn find_by_name(&self, name: &str) -> Option<World> {
        let wanted = normalize_world_name(name);
        self.worlds
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(&wanted))
            .map(|(id, known)| World {
                id: *id,
                name: known.clone(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (WorldId, &str)> {
        self.worlds.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> WorldDirectory {
        WorldDirectory::from_worlds([
            World::from_api(WorldId::new(1001), "Anvil Rock"),
            World::from_api(WorldId::new(2202), "Riverside [DE]"),
        ])
    }

    #[test]
    fn names_are_normalized_on_build() {
        let worlds = directory();
        assert_eq!(worlds.name(WorldId::new(2202)), Some("Riverside"));
        assert_eq!(worlds.name(WorldId::new(9999)), None);
    }

    #[test]
    fn find_by_name_ignores_case_and_qualifier() {
        let worlds = directory();
        let found = worlds.find_by_name("riverside [de]").unwrap();
        assert_eq!(found.id, WorldId::new(2202));
        assert_eq!(found.name, "Riverside");
        assert!(worlds.find_by_name("Nowhere").is_none());
    }

    #[test]
    fn serializes_as_plain_map() {
        let json = serde_json::to_value(directory()).unwrap();
        assert_eq!(json["1001"], "Anvil Rock");
        let back: WorldDirectory = serde_json::from_value(json).unwrap();
        assert_eq!(back, directory());
    }
}
