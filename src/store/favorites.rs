use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::library::TrackId;

use super::{read_toml, write_toml};

/// Named sets of favorite track ids.
///
/// Mutators return whether anything changed. Adding to or removing from a
/// list that does not exist changes nothing.
pub trait Favorites {
    /// Create an empty list. Blank or existing names are rejected.
    fn create_list(&mut self, name: &str) -> Result<bool, StoreError>;
    fn delete_list(&mut self, name: &str) -> Result<bool, StoreError>;
    fn list_names(&self) -> Vec<String>;
    fn ids_in_list(&self, name: &str) -> BTreeSet<TrackId>;
    fn add_track_to_list(&mut self, name: &str, id: TrackId) -> Result<bool, StoreError>;
    fn remove_track_from_list(&mut self, name: &str, id: TrackId) -> Result<bool, StoreError>;
    fn is_track_in_list(&self, name: &str, id: TrackId) -> bool;
    fn is_track_in_any_list(&self, id: TrackId) -> bool;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct FavoriteLists {
    lists: BTreeMap<String, BTreeSet<TrackId>>,
}

impl FavoriteLists {
    fn create(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.lists.contains_key(name) {
            return false;
        }
        self.lists.insert(name.to_string(), BTreeSet::new());
        true
    }

    fn delete(&mut self, name: &str) -> bool {
        self.lists.remove(name).is_some()
    }

    fn add(&mut self, name: &str, id: TrackId) -> bool {
        self.lists.get_mut(name).is_some_and(|ids| ids.insert(id))
    }

    fn remove(&mut self, name: &str, id: TrackId) -> bool {
        self.lists.get_mut(name).is_some_and(|ids| ids.remove(&id))
    }

    fn names(&self) -> Vec<String> {
        self.lists.keys().cloned().collect()
    }

    fn ids(&self, name: &str) -> BTreeSet<TrackId> {
        self.lists.get(name).cloned().unwrap_or_default()
    }

    fn contains(&self, name: &str, id: TrackId) -> bool {
        self.lists.get(name).is_some_and(|ids| ids.contains(&id))
    }

    fn contains_anywhere(&self, id: TrackId) -> bool {
        self.lists.values().any(|ids| ids.contains(&id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryFavorites {
    lists: FavoriteLists,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Favorites for MemoryFavorites {
    fn create_list(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.lists.create(name))
    }

    fn delete_list(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.lists.delete(name))
    }

    fn list_names(&self) -> Vec<String> {
        self.lists.names()
    }

    fn ids_in_list(&self, name: &str) -> BTreeSet<TrackId> {
        self.lists.ids(name)
    }

    fn add_track_to_list(&mut self, name: &str, id: TrackId) -> Result<bool, StoreError> {
        Ok(self.lists.add(name, id))
    }

    fn remove_track_from_list(&mut self, name: &str, id: TrackId) -> Result<bool, StoreError> {
        Ok(self.lists.remove(name, id))
    }

    fn is_track_in_list(&self, name: &str, id: TrackId) -> bool {
        self.lists.contains(name, id)
    }

    fn is_track_in_any_list(&self, id: TrackId) -> bool {
        self.lists.contains_anywhere(id)
    }
}

/// Favorites persisted to a TOML file after every change.
#[derive(Debug)]
pub struct FileFavorites {
    path: PathBuf,
    lists: FavoriteLists,
}

impl FileFavorites {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lists = read_toml(&path)?;
        Ok(Self { path, lists })
    }

    /// Apply `f` to a copy and persist it; memory only changes once the
    /// write succeeded.
    fn change(&mut self, f: impl FnOnce(&mut FavoriteLists) -> bool) -> Result<bool, StoreError> {
        let mut next = self.lists.clone();
        if !f(&mut next) {
            return Ok(false);
        }
        write_toml(&self.path, &next)?;
        self.lists = next;
        Ok(true)
    }
}

impl Favorites for FileFavorites {
    fn create_list(&mut self, name: &str) -> Result<bool, StoreError> {
        self.change(|l| l.create(name))
    }

    fn delete_list(&mut self, name: &str) -> Result<bool, StoreError> {
        self.change(|l| l.delete(name))
    }

    fn list_names(&self) -> Vec<String> {
        self.lists.names()
    }

    fn ids_in_list(&self, name: &str) -> BTreeSet<TrackId> {
        self.lists.ids(name)
    }

    fn add_track_to_list(&mut self, name: &str, id: TrackId) -> Result<bool, StoreError> {
        self.change(|l| l.add(name, id))
    }

    fn remove_track_from_list(&mut self, name: &str, id: TrackId) -> Result<bool, StoreError> {
        self.change(|l| l.remove(name, id))
    }

    fn is_track_in_list(&self, name: &str, id: TrackId) -> bool {
        self.lists.contains(name, id)
    }

    fn is_track_in_any_list(&self, id: TrackId) -> bool {
        self.lists.contains_anywhere(id)
    }
}
