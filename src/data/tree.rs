//! Parent/child tree construction and flattening for rendering.
//!
//! The tree is derived data: it borrows from the flat item slice and is
//! rebuilt on demand. Only the flattened rows (which hold indices, not
//! references) are cached by [`super::WorkItemList`].

use super::{WorkItem, WorkItemId};
use std::collections::HashMap;

/// A node of the derived tree. `index` points into the slice it was built from.
#[derive(Debug)]
pub struct TreeNode<'a> {
    pub index: usize,
    pub item: &'a WorkItem,
    pub children: Vec<TreeNode<'a>>,
}

/// One flattened, renderable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Index into the slice the tree was built from.
    pub index: usize,
    pub id: WorkItemId,
    pub depth: usize,
    /// `is_last_chain[l]` is true when the ancestor at level `l` (the row
    /// itself at `depth`) is the last among its siblings.
    pub is_last_chain: Vec<bool>,
    pub has_children: bool,
}

impl TreeRow {
    pub fn is_last(&self) -> bool {
        self.is_last_chain.last().copied().unwrap_or(true)
    }
}

/// Link items by `parent_id`, preserving input order among siblings.
///
/// Items whose parent is not in `items` become roots, so nothing is ever
/// hidden. Parent cycles are broken by promoting the first unreached member.
pub fn build_tree(items: &[WorkItem]) -> Vec<TreeNode<'_>> {
    let positions: HashMap<WorkItemId, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id, i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item.parent_id.and_then(|pid| positions.get(&pid)) {
            Some(&parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let mut visited = vec![false; items.len()];
    let mut nodes: Vec<TreeNode<'_>> = roots
        .into_iter()
        .map(|i| assemble(items, &children, i, &mut visited))
        .collect();

    // Anything still unvisited sits on a parent cycle.
    for i in 0..items.len() {
        if !visited[i] {
            nodes.push(assemble(items, &children, i, &mut visited));
        }
    }

    nodes
}

fn assemble<'a>(
    items: &'a [WorkItem],
    children: &[Vec<usize>],
    index: usize,
    visited: &mut [bool],
) -> TreeNode<'a> {
    visited[index] = true;
    let mut node = TreeNode {
        index,
        item: &items[index],
        children: Vec::with_capacity(children[index].len()),
    };
    for &child in &children[index] {
        if !visited[child] {
            node.children.push(assemble(items, children, child, visited));
        }
    }
    node
}

/// Pre-order traversal into rows carrying depth and last-sibling marks.
pub fn flatten(roots: &[TreeNode<'_>]) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    let last_root = roots.len().saturating_sub(1);
    for (i, root) in roots.iter().enumerate() {
        push_rows(root, vec![i == last_root], &mut rows);
    }
    rows
}

fn push_rows(node: &TreeNode<'_>, chain: Vec<bool>, rows: &mut Vec<TreeRow>) {
    rows.push(TreeRow {
        index: node.index,
        id: node.item.id,
        depth: chain.len().saturating_sub(1),
        is_last_chain: chain.clone(),
        has_children: !node.children.is_empty(),
    });

    let last_child = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let mut child_chain = chain.clone();
        child_chain.push(i == last_child);
        push_rows(child, child_chain, rows);
    }
}

/// Box-drawing prefix for a row, four columns per level.
pub fn tree_prefix(row: &TreeRow) -> String {
    if row.depth == 0 {
        return String::new();
    }

    let mut prefix = String::with_capacity(row.depth * 4);
    for level in 1..row.depth {
        let ancestor_is_last = row.is_last_chain.get(level).copied().unwrap_or(true);
        prefix.push_str(if ancestor_is_last { "    " } else { "│   " });
    }
    prefix.push_str(if row.is_last() { "╰── " } else { "├── " });
    prefix
}

/// Index one past the end of the subtree rooted at `rows[at]`.
pub fn subtree_end(rows: &[TreeRow], at: usize) -> usize {
    let Some(root) = rows.get(at) else {
        return rows.len();
    };
    rows.iter()
        .enumerate()
        .skip(at + 1)
        .find(|(_, row)| row.depth <= root.depth)
        .map(|(i, _)| i)
        .unwrap_or(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: WorkItemId, parent: Option<WorkItemId>) -> WorkItem {
        WorkItem {
            id,
            title: format!("Item {id}"),
            parent_id: parent,
            ..Default::default()
        }
    }

    fn ids(rows: &[TreeRow]) -> Vec<WorkItemId> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_flatten_with_orphans() {
        let items = vec![item(1, None), item(2, Some(99)), item(3, Some(1))];
        let roots = build_tree(&items);
        assert_eq!(roots.iter().map(|r| r.item.id).collect::<Vec<_>>(), vec![1, 2]);

        let rows = flatten(&roots);
        assert_eq!(ids(&rows), vec![1, 3, 2]);
        assert_eq!(rows.iter().map(|r| r.depth).collect::<Vec<_>>(), vec![0, 1, 0]);
        // Level 0 is the root ancestor's own flag: #3 sits under #1, which is not the last root
        assert_eq!(
            rows.iter().map(|r| r.is_last_chain.clone()).collect::<Vec<_>>(),
            vec![vec![false], vec![false, true], vec![true]]
        );
    }

    #[test]
    fn test_tree_prefix() {
        let row = TreeRow {
            index: 0,
            id: 1,
            depth: 1,
            is_last_chain: vec![false, true],
            has_children: false,
        };
        assert_eq!(tree_prefix(&row), "╰── ");

        let row = TreeRow {
            index: 0,
            id: 1,
            depth: 2,
            is_last_chain: vec![false, false, true],
            has_children: false,
        };
        assert_eq!(tree_prefix(&row), "│   ╰── ");

        let row = TreeRow {
            index: 0,
            id: 1,
            depth: 3,
            is_last_chain: vec![true, true, false, false],
            has_children: false,
        };
        assert_eq!(tree_prefix(&row), "    │   ├── ");
    }

    #[test]
    fn test_root_has_no_prefix() {
        let items = vec![item(1, None)];
        let rows = flatten(&build_tree(&items));
        assert_eq!(tree_prefix(&rows[0]), "");
    }

    #[test]
    fn test_siblings_keep_input_order() {
        let items = vec![
            item(10, None),
            item(13, Some(10)),
            item(11, Some(10)),
            item(12, Some(10)),
        ];
        let rows = flatten(&build_tree(&items));
        assert_eq!(ids(&rows), vec![10, 13, 11, 12]);
        assert!(rows[0].has_children);
        assert!(rows[3].is_last());
        assert!(!rows[1].is_last());
    }

    #[test]
    fn test_child_listed_before_parent() {
        let items = vec![item(2, Some(1)), item(1, None)];
        let rows = flatten(&build_tree(&items));
        assert_eq!(ids(&rows), vec![1, 2]);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[1].index, 0);
    }

    #[test]
    fn test_parent_cycle_is_not_hidden() {
        let items = vec![item(1, Some(2)), item(2, Some(1)), item(3, None)];
        let rows = flatten(&build_tree(&items));
        assert_eq!(rows.len(), 3);
        let mut seen = ids(&rows);
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_self_parent_is_root() {
        let items = vec![item(5, Some(5))];
        let rows = flatten(&build_tree(&items));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].depth, 0);
    }

    #[test]
    fn test_tree_integrity_over_generated_lists() {
        // Deterministic pseudo-random parent assignment
        let mut seed: u64 = 0x5eed;
        for size in [0usize, 1, 2, 5, 17, 60] {
            let items: Vec<WorkItem> = (0..size)
                .map(|i| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let parent = match (seed >> 33) % 4 {
                        0 => None,
                        1 => Some(1000 + i as i64), // dangling
                        _ => Some(((seed >> 40) % (size as u64 + 1)) as i64),
                    };
                    item(i as i64, parent)
                })
                .collect();

            let rows = flatten(&build_tree(&items));
            assert_eq!(rows.len(), items.len());

            for (pos, row) in rows.iter().enumerate() {
                assert_eq!(row.depth + 1, row.is_last_chain.len());
                let it = &items[row.index];
                if row.depth > 0 {
                    let parent = it.parent_id.expect("non-root row has a parent");
                    assert!(rows[..pos].iter().any(|r| r.id == parent));
                }
            }
        }
    }

    #[test]
    fn test_subtree_end() {
        let items = vec![
            item(1, None),
            item(2, Some(1)),
            item(3, Some(2)),
            item(4, None),
        ];
        let rows = flatten(&build_tree(&items));
        assert_eq!(subtree_end(&rows, 0), 3);
        assert_eq!(subtree_end(&rows, 1), 3);
        assert_eq!(subtree_end(&rows, 3), 4);
        assert_eq!(subtree_end(&rows, 9), 4);
    }
}
