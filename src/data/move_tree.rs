//! Filtered move tree: a parent's subtree with completed items left out.

use super::tree::{build_tree, TreeNode};
use super::{category_of, StateCategories, StateCategory, WorkItem, WorkItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveNode {
    pub id: WorkItemId,
    pub children: Vec<MoveNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoveTree {
    /// `None` when the selected root is itself completed (or not found).
    pub root: Option<MoveNode>,
    /// Completed descendants of the selected root.
    pub skipped: usize,
}

impl MoveTree {
    /// Every id in the tree, pre-order, root first.
    pub fn ids(&self) -> Vec<WorkItemId> {
        let mut ids = Vec::new();
        if let Some(root) = &self.root {
            collect_ids(root, &mut ids);
        }
        ids
    }

    /// Non-completed descendants that would move along with the root.
    pub fn child_count(&self) -> usize {
        self.ids().len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

fn collect_ids(node: &MoveNode, ids: &mut Vec<WorkItemId>) {
    ids.push(node.id);
    for child in &node.children {
        collect_ids(child, ids);
    }
}

/// Build the filtered move tree for `root_id` from the visible `items`.
pub fn build_move_tree(
    items: &[WorkItem],
    root_id: WorkItemId,
    categories: &StateCategories,
) -> MoveTree {
    let roots = build_tree(items);
    let Some(node) = find_node(&roots, root_id) else {
        return MoveTree::default();
    };

    let skipped = node
        .children
        .iter()
        .map(|child| count_completed(child, categories))
        .sum();

    MoveTree {
        root: copy_open(node, categories),
        skipped,
    }
}

fn is_completed(node: &TreeNode<'_>, categories: &StateCategories) -> bool {
    category_of(categories, &node.item.state) == StateCategory::Completed
}

fn find_node<'t, 'a>(nodes: &'t [TreeNode<'a>], id: WorkItemId) -> Option<&'t TreeNode<'a>> {
    nodes.iter().find_map(|node| {
        if node.item.id == id {
            Some(node)
        } else {
            find_node(&node.children, id)
        }
    })
}

fn copy_open(node: &TreeNode<'_>, categories: &StateCategories) -> Option<MoveNode> {
    if is_completed(node, categories) {
        return None;
    }
    Some(MoveNode {
        id: node.item.id,
        children: node
            .children
            .iter()
            .filter_map(|child| copy_open(child, categories))
            .collect(),
    })
}

fn count_completed(node: &TreeNode<'_>, categories: &StateCategories) -> usize {
    usize::from(is_completed(node, categories))
        + node
            .children
            .iter()
            .map(|child| count_completed(child, categories))
            .sum::<usize>()
}
