//! Core domain model: work items, sprints, state categories and list keys.

mod list;
mod move_tree;
mod registry;
pub mod tree;

pub use list::{matches_filter, WorkItemList, LOAD_MORE_STEP, PAGE_SIZE};
pub use move_tree::{build_move_tree, MoveNode, MoveTree};
pub use registry::ListRegistry;
pub use tree::{build_tree, flatten, tree_prefix, TreeNode, TreeRow};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend-assigned work item identifier.
pub type WorkItemId = i64;

/// A single tracked unit of work (bug, task, user story, ...).
///
/// `parent_id` is a weak reference: it is resolved by lookup in whichever list
/// the item currently sits in. Children are never stored on the item itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub title: String,
    pub description: String,
    pub state: String,
    pub work_item_type: String,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub priority: Option<i64>,
    pub created_date: Option<DateTime<Utc>>,
    pub changed_date: Option<DateTime<Utc>>,
    pub iteration_path: String,
    pub area_path: String,
    pub parent_id: Option<WorkItemId>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub created_date: Option<DateTime<Utc>>,
}

/// An iteration. The path is the only identity that matters; compare with `==`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub name: String,
    pub path: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// The three sprint slots around "now". Any slot may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprintSlots {
    pub previous: Option<Sprint>,
    pub current: Option<Sprint>,
    pub next: Option<Sprint>,
}

impl SprintSlots {
    pub fn get(&self, tab: SprintTab) -> Option<&Sprint> {
        match tab {
            SprintTab::Previous => self.previous.as_ref(),
            SprintTab::Current => self.current.as_ref(),
            SprintTab::Next => self.next.as_ref(),
        }
    }

    pub fn path(&self, tab: SprintTab) -> Option<&str> {
        self.get(tab).map(|s| s.path.as_str())
    }

    /// Present slots in previous/current/next order.
    pub fn available(&self) -> Vec<(SprintTab, &Sprint)> {
        SprintTab::all()
            .filter_map(|tab| self.get(tab).map(|s| (tab, s)))
            .collect()
    }

    /// Which slot (if any) holds the given iteration path.
    pub fn tab_for_path(&self, path: &str) -> Option<SprintTab> {
        SprintTab::all().find(|tab| self.path(*tab) == Some(path))
    }
}

/// Coarse classification of a state name, fetched per work item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateCategory {
    Proposed,
    InProgress,
    Completed,
    Removed,
}

impl StateCategory {
    /// Map the category string reported by Azure DevOps.
    ///
    /// `Resolved` is treated as still in progress.
    pub fn from_api(category: &str) -> Self {
        match category {
            "Proposed" => Self::Proposed,
            "Completed" => Self::Completed,
            "Removed" => Self::Removed,
            _ => Self::InProgress,
        }
    }

    /// Best guess for a state whose category has not been loaded yet.
    pub fn guess(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "closed" | "done" | "completed" => Self::Completed,
            "removed" | "cut" => Self::Removed,
            "new" | "to do" | "proposed" | "approved" => Self::Proposed,
            _ => Self::InProgress,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Proposed => "Proposed",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Removed => "Removed",
        }
    }
}

/// State name to category, merged across every work item type loaded so far.
pub type StateCategories = HashMap<String, StateCategory>;

/// Category for `state`, falling back to [`StateCategory::guess`].
pub fn category_of(categories: &StateCategories, state: &str) -> StateCategory {
    categories
        .get(state)
        .copied()
        .unwrap_or_else(|| StateCategory::guess(state))
}

/// Top-level view mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Sprint,
    Backlog,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sprint => "Sprints",
            Self::Backlog => "Backlog",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Self::Sprint => Self::Backlog,
            Self::Backlog => Self::Sprint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SprintTab {
    Previous,
    #[default]
    Current,
    Next,
}

impl SprintTab {
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Previous, Self::Current, Self::Next].into_iter()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Previous => "Previous",
            Self::Current => "Current",
            Self::Next => "Next",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BacklogTab {
    #[default]
    Recent,
    Abandoned,
}

impl BacklogTab {
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Recent, Self::Abandoned].into_iter()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Recent => "Recent",
            Self::Abandoned => "Abandoned",
        }
    }
}

/// Identifies one of the five independent lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKey {
    Sprint(SprintTab),
    Backlog(BacklogTab),
}

impl Default for ListKey {
    fn default() -> Self {
        Self::Sprint(SprintTab::Current)
    }
}

impl ListKey {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Sprint(_) => Mode::Sprint,
            Self::Backlog(_) => Mode::Backlog,
        }
    }

    /// All tabs belonging to `mode`, in display order.
    pub fn tabs(mode: Mode) -> Vec<ListKey> {
        match mode {
            Mode::Sprint => SprintTab::all().map(ListKey::Sprint).collect(),
            Mode::Backlog => BacklogTab::all().map(ListKey::Backlog).collect(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sprint(tab) => tab.label(),
            Self::Backlog(tab) => tab.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprint(name: &str) -> Sprint {
        Sprint {
            name: name.to_string(),
            path: format!("Proj\\{name}"),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_category_fallback() {
        let mut categories = StateCategories::new();
        categories.insert("Closed".to_string(), StateCategory::Completed);
        categories.insert("Doing".to_string(), StateCategory::InProgress);

        assert_eq!(category_of(&categories, "Closed"), StateCategory::Completed);
        assert_eq!(category_of(&categories, "Doing"), StateCategory::InProgress);
        // Not loaded: heuristics
        assert_eq!(category_of(&categories, "Done"), StateCategory::Completed);
        assert_eq!(category_of(&categories, "New"), StateCategory::Proposed);
        assert_eq!(category_of(&categories, "Removed"), StateCategory::Removed);
        assert_eq!(category_of(&categories, "Active"), StateCategory::InProgress);
    }

    #[test]
    fn test_api_category_resolved_is_in_progress() {
        assert_eq!(StateCategory::from_api("Resolved"), StateCategory::InProgress);
        assert_eq!(StateCategory::from_api("Completed"), StateCategory::Completed);
    }

    #[test]
    fn test_sprint_slots_lookup() {
        let slots = SprintSlots {
            previous: None,
            current: Some(sprint("S2")),
            next: Some(sprint("S3")),
        };

        assert_eq!(slots.path(SprintTab::Current), Some("Proj\\S2"));
        assert_eq!(slots.available().len(), 2);
        assert_eq!(slots.tab_for_path("Proj\\S3"), Some(SprintTab::Next));
        assert_eq!(slots.tab_for_path("Proj\\S1"), None);
    }

    #[test]
    fn test_list_key_tabs() {
        assert_eq!(ListKey::tabs(Mode::Sprint).len(), 3);
        assert_eq!(
            ListKey::tabs(Mode::Backlog),
            vec![
                ListKey::Backlog(BacklogTab::Recent),
                ListKey::Backlog(BacklogTab::Abandoned)
            ]
        );
        assert_eq!(ListKey::default().mode(), Mode::Sprint);
    }
}
