//! The five independent lists, keyed by mode and tab.

use super::{ListKey, WorkItem, WorkItemId, WorkItemList};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ListRegistry {
    lists: HashMap<ListKey, WorkItemList>,
}

impl ListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ListKey) -> Option<&WorkItemList> {
        self.lists.get(&key)
    }

    /// Lookup, creating an empty list on first use.
    pub fn get_mut(&mut self, key: ListKey) -> &mut WorkItemList {
        self.lists.entry(key).or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ListKey> {
        self.lists.keys()
    }

    /// Find an item in any list, preferring `first`.
    pub fn find_item(&self, first: ListKey, id: WorkItemId) -> Option<&WorkItem> {
        self.get(first)
            .and_then(|l| l.get(id))
            .or_else(|| self.lists.values().find_map(|l| l.get(id)))
    }

    /// Apply a refreshed item to every list holding it.
    pub fn update_everywhere(&mut self, item: &WorkItem) -> usize {
        self.lists
            .values_mut()
            .map(|list| usize::from(list.update_item(item)))
            .sum()
    }

    /// Remove an item from every list holding it.
    pub fn remove_everywhere(&mut self, id: WorkItemId) -> usize {
        self.lists
            .values_mut()
            .map(|list| usize::from(list.remove(id)))
            .sum()
    }
}
