//! Per-tab work item list: pagination counters, cursor, filter and tree cache.

use super::tree::{build_tree, flatten, subtree_end, TreeRow};
use super::{WorkItem, WorkItemId};
use once_cell::unsync::OnceCell;
use std::collections::HashSet;

/// Items requested per page (initial load and "load more").
pub const PAGE_SIZE: usize = 40;
/// Threshold for the "Load More" vs "Load All" label.
pub const LOAD_MORE_STEP: usize = 30;

/// Case-insensitive title substring or decimal id prefix match.
pub fn matches_filter(item: &WorkItem, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let id_query = query.strip_prefix('#').unwrap_or(query);
    if !id_query.is_empty()
        && id_query.chars().all(|c| c.is_ascii_digit())
        && item.id.to_string().starts_with(id_query)
    {
        return true;
    }
    item.title.to_lowercase().contains(&query.to_lowercase())
}

/// One independent list of work items (one per tab).
///
/// `cursor` indexes the flattened tree (plus an optional trailing
/// "Load More" row), never `tasks` directly.
#[derive(Debug, Default)]
pub struct WorkItemList {
    tasks: Vec<WorkItem>,
    total_count: usize,
    attempted: bool,
    loading: bool,
    generation: u64,

    cursor: usize,
    scroll_offset: usize,

    filter_active: bool,
    filter_query: String,
    filtered_tasks: Option<Vec<WorkItem>>,

    tree_cache: OnceCell<Vec<TreeRow>>,
    cache_version: u64,
}

impl WorkItemList {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Counters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[WorkItem] {
        &self.tasks
    }

    pub fn loaded(&self) -> usize {
        self.tasks.len()
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn has_more(&self) -> bool {
        self.loaded() < self.total_count
    }

    pub fn remaining(&self) -> usize {
        self.total_count.saturating_sub(self.loaded())
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Identifies the latest replace-load; older results are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cache_version(&self) -> u64 {
        self.cache_version
    }

    pub fn contains(&self, id: WorkItemId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn ids(&self) -> Vec<WorkItemId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Mark a replace-load as issued and return its generation.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.attempted = true;
        self.loading = true;
        self.generation
    }

    /// Mark an append-load as issued. The generation is unchanged so a
    /// later replace still supersedes it.
    pub fn begin_append(&mut self) -> u64 {
        self.loading = true;
        self.generation
    }

    pub fn load_failed(&mut self) {
        self.loading = false;
        self.attempted = true;
    }

    /// Extend with a further page. Items already present are skipped.
    pub fn append(&mut self, new_tasks: Vec<WorkItem>) {
        let known: HashSet<WorkItemId> = self.tasks.iter().map(|t| t.id).collect();
        self.tasks
            .extend(new_tasks.into_iter().filter(|t| !known.contains(&t.id)));
        self.loading = false;
        self.refilter();
        self.invalidate();
    }

    /// Overwrite with a fresh first page.
    pub fn replace(&mut self, new_tasks: Vec<WorkItem>, total_count: usize) {
        self.tasks = new_tasks;
        self.total_count = total_count;
        self.attempted = true;
        self.loading = false;
        self.refilter();
        self.invalidate();
    }

    /// Forget everything but the generation counter, so in-flight results
    /// for the previous contents are recognised as stale.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        let cache_version = self.cache_version;
        *self = Self::default();
        self.generation = generation;
        self.cache_version = cache_version;
        self.invalidate();
    }

    /// Drop an item (after a delete or a move out of this list).
    pub fn remove(&mut self, id: WorkItemId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return false;
        }
        self.total_count = self.total_count.saturating_sub(1);
        if let Some(filtered) = self.filtered_tasks.as_mut() {
            filtered.retain(|t| t.id != id);
        }
        self.invalidate();
        self.clamp_cursor();
        true
    }

    /// Swap in a refreshed copy of an item held by this list.
    pub fn update_item(&mut self, item: &WorkItem) -> bool {
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == item.id) else {
            return false;
        };
        *slot = item.clone();
        if let Some(filtered) = self.filtered_tasks.as_mut() {
            if let Some(slot) = filtered.iter_mut().find(|t| t.id == item.id) {
                *slot = item.clone();
            }
        }
        self.invalidate();
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filter
    // ─────────────────────────────────────────────────────────────────────────

    /// Filtered subset when a filter has been applied, otherwise all tasks.
    ///
    /// An active flag without a computed subset counts as no filter.
    pub fn visible_tasks(&self) -> &[WorkItem] {
        match (&self.filtered_tasks, self.filter_active) {
            (Some(filtered), true) => filtered,
            _ => &self.tasks,
        }
    }

    pub fn filter_active(&self) -> bool {
        self.filter_active && self.filtered_tasks.is_some()
    }

    pub fn filter_query(&self) -> &str {
        &self.filter_query
    }

    pub fn filtered_tasks(&self) -> Option<&[WorkItem]> {
        self.filtered_tasks.as_deref()
    }

    /// Apply a filter query; an empty query clears the filter.
    pub fn set_filter(&mut self, query: &str) {
        if query.trim().is_empty() {
            self.clear_filter();
            return;
        }
        self.filter_query = query.to_string();
        self.filter_active = true;
        self.filtered_tasks = Some(self.compute_filtered());
        self.invalidate();
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    pub fn clear_filter(&mut self) {
        let was_filtering = self.filter_active || self.filtered_tasks.is_some();
        self.filter_query.clear();
        self.filter_active = false;
        self.filtered_tasks = None;
        if was_filtering {
            self.invalidate();
            self.clamp_cursor();
        }
    }

    fn compute_filtered(&self) -> Vec<WorkItem> {
        self.tasks
            .iter()
            .filter(|t| matches_filter(t, &self.filter_query))
            .cloned()
            .collect()
    }

    fn refilter(&mut self) {
        if self.filter_active {
            self.filtered_tasks = Some(self.compute_filtered());
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tree cache
    // ─────────────────────────────────────────────────────────────────────────

    /// Flattened tree of the visible tasks, memoised until the next mutation.
    pub fn tree(&self) -> &[TreeRow] {
        self.tree_cache
            .get_or_init(|| flatten(&build_tree(self.visible_tasks())))
    }

    pub fn is_cached(&self) -> bool {
        self.tree_cache.get().is_some()
    }

    pub fn invalidate(&mut self) {
        self.cache_version += 1;
        self.tree_cache.take();
    }

    /// Work item shown at flattened `row`.
    pub fn item_at(&self, row: usize) -> Option<&WorkItem> {
        let tree_row = self.tree().get(row)?;
        self.visible_tasks().get(tree_row.index)
    }

    pub fn row_at(&self, row: usize) -> Option<&TreeRow> {
        self.tree().get(row)
    }

    pub fn row_of(&self, id: WorkItemId) -> Option<usize> {
        self.tree().iter().position(|r| r.id == id)
    }

    /// Renderable rows including the synthetic "Load More" row.
    pub fn row_count(&self) -> usize {
        self.tree().len() + usize::from(self.has_more())
    }

    pub fn is_load_more_row(&self, row: usize) -> bool {
        self.has_more() && row == self.tree().len()
    }

    pub fn load_more_label(&self) -> Option<String> {
        if !self.has_more() {
            return None;
        }
        let remaining = self.remaining();
        Some(if remaining > LOAD_MORE_STEP {
            format!("Load More (+{LOAD_MORE_STEP})")
        } else {
            format!("Load All (+{remaining})")
        })
    }

    /// Whether `id` has children in the visible tree.
    pub fn has_visible_children(&self, id: WorkItemId) -> bool {
        self.tree().iter().any(|r| r.id == id && r.has_children)
    }

    /// Row one past the subtree of `row`.
    pub fn subtree_end(&self, row: usize) -> usize {
        subtree_end(self.tree(), row)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cursor and scrolling
    // ─────────────────────────────────────────────────────────────────────────

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn selected_item(&self) -> Option<&WorkItem> {
        self.item_at(self.cursor)
    }

    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.row_at(self.cursor)
    }

    pub fn cursor_on_load_more(&self) -> bool {
        self.is_load_more_row(self.cursor)
    }

    pub fn clamp_cursor(&mut self) {
        let count = self.row_count();
        if count == 0 {
            self.cursor = 0;
        } else if self.cursor >= count {
            self.cursor = count - 1;
        }
    }

    pub fn set_cursor(&mut self, row: usize, content_height: usize) {
        self.cursor = row;
        self.clamp_cursor();
        self.adjust_scroll(content_height);
    }

    pub fn move_cursor(&mut self, delta: isize, content_height: usize) {
        let target = if delta < 0 {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta.unsigned_abs())
        };
        self.set_cursor(target, content_height);
    }

    pub fn go_to_top(&mut self, content_height: usize) {
        self.set_cursor(0, content_height);
    }

    pub fn go_to_bottom(&mut self, content_height: usize) {
        self.set_cursor(self.row_count().saturating_sub(1), content_height);
    }

    /// Reset cursor and scroll to the top (replace results).
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    /// Keep the cursor inside the visible window.
    pub fn adjust_scroll(&mut self, content_height: usize) {
        let height = content_height.max(1);
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + height {
            self.scroll_offset = self.cursor + 1 - height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: WorkItemId, title: &str, parent: Option<WorkItemId>) -> WorkItem {
        WorkItem {
            id,
            title: title.to_string(),
            parent_id: parent,
            ..Default::default()
        }
    }

    fn numbered(range: std::ops::RangeInclusive<i64>) -> Vec<WorkItem> {
        range.map(|i| item(i, &format!("Task {i}"), None)).collect()
    }

    #[test]
    fn test_loaded_tracks_tasks() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=40), 65);
        assert_eq!(list.loaded(), 40);
        assert!(list.has_more());
        assert_eq!(list.remaining(), 25);
        assert!(list.attempted());

        list.append(numbered(41..=65));
        assert_eq!(list.loaded(), 65);
        assert!(!list.has_more());
        assert_eq!(list.remaining(), 0);
    }

    #[test]
    fn test_loaded_beyond_total_is_fully_loaded() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=5), 3);
        assert!(!list.has_more());
        assert_eq!(list.remaining(), 0);
        assert_eq!(list.row_count(), 5);
    }

    #[test]
    fn test_append_skips_duplicates() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=3), 5);
        list.append(numbered(3..=5));
        assert_eq!(list.ids(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_every_mutation_bumps_cache_version_once() {
        let mut list = WorkItemList::new();
        let v0 = list.cache_version();

        list.replace(numbered(1..=3), 3);
        assert_eq!(list.cache_version(), v0 + 1);

        list.append(numbered(4..=4));
        assert_eq!(list.cache_version(), v0 + 2);

        list.set_filter("task 1");
        assert_eq!(list.cache_version(), v0 + 3);

        list.clear_filter();
        assert_eq!(list.cache_version(), v0 + 4);

        list.remove(2);
        assert_eq!(list.cache_version(), v0 + 5);

        list.update_item(&item(1, "Renamed", None));
        assert_eq!(list.cache_version(), v0 + 6);
    }

    #[test]
    fn test_tree_cache_hits_until_invalidated() {
        let mut list = WorkItemList::new();
        list.replace(vec![item(1, "a", None), item(2, "b", Some(1))], 2);
        assert!(!list.is_cached());

        let first = list.tree().to_vec();
        assert!(list.is_cached());
        let second = list.tree().to_vec();
        assert_eq!(first, second);

        list.append(vec![item(3, "c", Some(1))]);
        assert!(!list.is_cached());
        assert_eq!(list.tree().len(), 3);
    }

    #[test]
    fn test_filter_by_title_and_id_prefix() {
        let mut list = WorkItemList::new();
        list.replace(
            vec![
                item(120, "Fix login", None),
                item(121, "Write docs", None),
                item(305, "LOGIN page polish", None),
            ],
            3,
        );

        list.set_filter("login");
        assert!(list.filter_active());
        let ids: Vec<_> = list.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![120, 305]);

        list.set_filter("12");
        let ids: Vec<_> = list.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![120, 121]);

        list.set_filter("#30");
        let ids: Vec<_> = list.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![305]);

        list.set_filter("   ");
        assert!(!list.filter_active());
        assert_eq!(list.visible_tasks().len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=30), 30);

        list.set_filter("task 2");
        let first = list.filtered_tasks().map(<[WorkItem]>::to_vec);
        list.clear_filter();
        assert!(list.filtered_tasks().is_none());
        list.set_filter("task 2");
        let second = list.filtered_tasks().map(<[WorkItem]>::to_vec);

        assert_eq!(first, second);
    }

    #[test]
    fn test_filtered_child_without_parent_is_promoted() {
        let mut list = WorkItemList::new();
        list.replace(
            vec![item(1, "Epic", None), item(2, "needle", Some(1))],
            2,
        );
        list.set_filter("needle");
        let rows = list.tree();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].depth, 0);
    }

    #[test]
    fn test_filter_tracks_new_pages() {
        let mut list = WorkItemList::new();
        list.replace(vec![item(1, "alpha", None)], 2);
        list.set_filter("beta");
        assert_eq!(list.visible_tasks().len(), 0);
        list.append(vec![item(2, "beta", None)]);
        assert_eq!(list.visible_tasks().len(), 1);
    }

    #[test]
    fn test_cursor_clamps_with_load_more_row() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=3), 10);
        assert_eq!(list.row_count(), 4);

        list.move_cursor(100, 5);
        assert_eq!(list.cursor(), 3);
        assert!(list.cursor_on_load_more());
        assert!(list.selected_item().is_none());

        list.move_cursor(-100, 5);
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn test_cursor_invariant_over_key_sequences() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=25), 40);
        let deltas = [1isize, 10, -3, 10, 10, -10, 1, 1, 1, -1, 100, -7, 10];
        for delta in deltas {
            list.move_cursor(delta, 8);
            assert!(list.cursor() < list.row_count());
            assert!(list.cursor() >= list.scroll_offset());
            assert!(list.cursor() < list.scroll_offset() + 8);
        }
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=40), 40);
        list.set_cursor(20, 10);
        assert_eq!(list.scroll_offset(), 11);
        list.set_cursor(5, 10);
        assert_eq!(list.scroll_offset(), 5);
        list.set_cursor(14, 10);
        assert_eq!(list.scroll_offset(), 5);
    }

    #[test]
    fn test_load_more_label() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=40), 100);
        assert_eq!(list.load_more_label().as_deref(), Some("Load More (+30)"));

        list.replace(numbered(1..=40), 65);
        assert_eq!(list.load_more_label().as_deref(), Some("Load All (+25)"));

        list.replace(numbered(1..=40), 40);
        assert_eq!(list.load_more_label(), None);
    }

    #[test]
    fn test_remove_clamps_cursor() {
        let mut list = WorkItemList::new();
        list.replace(numbered(1..=3), 3);
        list.set_cursor(2, 10);
        assert!(list.remove(3));
        assert_eq!(list.cursor(), 1);
        assert_eq!(list.total_count(), 2);
        assert!(!list.remove(42));
    }

    #[test]
    fn test_reset_bumps_generation() {
        let mut list = WorkItemList::new();
        let generation = list.begin_load();
        list.replace(numbered(1..=3), 3);
        list.reset();
        assert!(list.generation() > generation);
        assert_eq!(list.loaded(), 0);
        assert!(!list.attempted());
    }
}
