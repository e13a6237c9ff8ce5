//! Batch selection, state changes and sprint moves.
//!
//! Operations act on the selection when it is non-empty and on the focused
//! item otherwise. A single parent with open children asks before moving
//! them along; completed descendants never move.

use super::app::{App, PendingMove, PendingPicker, ViewState};
use super::command::Command;
use crate::data::{build_move_tree, Sprint, SprintTab, WorkItemId};

impl App {
    pub(crate) fn toggle_selection(&mut self) {
        let Some(id) = self.selected_item().map(|i| i.id) else {
            return;
        };
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    /// Ids an action applies to, and whether they came from the selection.
    ///
    /// The detail view always acts on the item it shows.
    pub fn action_targets(&self) -> (Vec<WorkItemId>, bool) {
        if let ViewState::Detail { id, .. } = self.view {
            return (vec![id], false);
        }
        if self.selection.is_empty() {
            (self.focused_item_id().into_iter().collect(), false)
        } else {
            let mut ids: Vec<WorkItemId> = self.selection.iter().copied().collect();
            ids.sort_unstable();
            (ids, true)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State changes
    // ─────────────────────────────────────────────────────────────────────────

    /// `e` in the list: the batch menu for a selection, else the state picker.
    pub(crate) fn open_edit_menu(&mut self) -> Vec<Command> {
        if self.selection.is_empty() {
            self.open_state_picker()
        } else {
            self.view = ViewState::BatchEditMenu { cursor: 0 };
            Vec::new()
        }
    }

    /// Open the state picker, loading the type's states first if needed.
    pub(crate) fn open_state_picker(&mut self) -> Vec<Command> {
        let (targets, batch) = self.action_targets();
        let Some(work_item_type) = targets
            .first()
            .and_then(|id| self.find_item(*id))
            .map(|item| item.work_item_type.clone())
        else {
            return Vec::new();
        };

        if self.type_states.contains_key(&work_item_type) {
            self.show_state_picker(targets, work_item_type, batch);
            return Vec::new();
        }

        self.set_status(format!("Loading states for {work_item_type}"));
        self.pending_picker = Some(PendingPicker {
            targets,
            work_item_type: work_item_type.clone(),
            batch,
            origin: self.view.clone(),
        });
        self.request_states([work_item_type.as_str()])
    }

    pub(crate) fn show_state_picker(
        &mut self,
        targets: Vec<WorkItemId>,
        work_item_type: String,
        batch: bool,
    ) {
        let states = self
            .type_states
            .get(&work_item_type)
            .cloned()
            .unwrap_or_default();
        let current = targets
            .first()
            .and_then(|id| self.find_item(*id))
            .map(|item| item.state.clone());
        let cursor = current
            .and_then(|state| states.iter().position(|s| *s == state))
            .unwrap_or(0);
        self.view = ViewState::StatePicker {
            targets,
            work_item_type,
            states,
            cursor,
            batch,
        };
    }

    pub(crate) fn apply_state(
        &mut self,
        targets: &[WorkItemId],
        state: &str,
        batch: bool,
    ) -> Vec<Command> {
        self.begin_operation();
        self.view = ViewState::List;
        if batch {
            self.selection.clear();
        }
        match targets {
            [id] => self.set_status(format!("Setting #{id} to {state}")),
            _ => self.set_status(format!("Setting {} items to {state}", targets.len())),
        }
        targets
            .iter()
            .map(|&id| Command::UpdateState {
                id,
                state: state.to_string(),
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sprint moves
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn open_sprint_picker(&mut self) {
        let (targets, batch) = self.action_targets();
        if targets.is_empty() {
            return;
        }
        let available = self.sprints.available();
        if available.is_empty() {
            self.set_status("No sprints available");
            return;
        }
        let cursor = available
            .iter()
            .position(|(tab, _)| *tab == SprintTab::Current)
            .unwrap_or(0);
        self.view = ViewState::SprintPicker {
            targets,
            cursor,
            batch,
        };
    }

    /// Sprint chosen in the picker.
    pub(crate) fn move_to_sprint(
        &mut self,
        targets: Vec<WorkItemId>,
        sprint: &Sprint,
        batch: bool,
    ) -> Vec<Command> {
        self.begin_operation();
        if batch {
            self.selection.clear();
        }

        let [parent] = targets[..] else {
            self.set_status(format!(
                "Moving {} items to {}",
                targets.len(),
                sprint.name
            ));
            return self.issue_moves(targets, sprint);
        };

        let has_children = self
            .current_list()
            .is_some_and(|list| list.has_visible_children(parent));
        if !has_children {
            self.set_status(format!("Moving #{parent} to {}", sprint.name));
            return self.issue_moves(vec![parent], sprint);
        }

        let Some(list) = self.current_list() else {
            return Vec::new();
        };
        let tree = build_move_tree(list.visible_tasks(), parent, &self.state_categories);
        if tree.skipped > 0 {
            self.set_status(format!(
                "Filtered {} completed item(s) from move",
                tree.skipped
            ));
        }

        let open_children = tree.child_count();
        if open_children == 0 {
            self.set_status(format!("Moving #{parent} to {}", sprint.name));
            return self.issue_moves(vec![parent], sprint);
        }

        self.set_status(format!(
            "Move #{parent} with {open_children} open child item(s) to {}? (y/n/esc)",
            sprint.name
        ));
        self.view = ViewState::MoveChildrenConfirm {
            parent,
            tree,
            iteration_path: sprint.path.clone(),
            sprint_name: sprint.name.clone(),
        };
        Vec::new()
    }

    /// `y` moves the parent with its open children, `n` moves it alone.
    pub(crate) fn confirm_move_children(&mut self, include_children: bool) -> Vec<Command> {
        let ViewState::MoveChildrenConfirm {
            parent,
            tree,
            iteration_path,
            sprint_name,
        } = std::mem::replace(&mut self.view, ViewState::List)
        else {
            return Vec::new();
        };

        let skipped = tree.skipped;
        let children = tree.child_count();
        let text = match (include_children, skipped > 0) {
            (true, true) => format!(
                "Moving #{parent} with {children} child item(s) to {sprint_name} ({skipped} completed skipped)"
            ),
            (true, false) => {
                format!("Moving #{parent} with {children} child item(s) to {sprint_name}")
            }
            (false, true) => format!(
                "Moving #{parent} to {sprint_name} without children ({skipped} completed skipped)"
            ),
            (false, false) => format!("Moving #{parent} to {sprint_name} without children"),
        };
        self.set_status(text);

        let ids = if include_children {
            tree.ids()
        } else {
            vec![parent]
        };
        let sprint = Sprint {
            name: sprint_name,
            path: iteration_path,
            start_date: None,
            end_date: None,
        };
        self.issue_moves(ids, &sprint)
    }

    /// One move command per id, tallied under a fresh operation id.
    fn issue_moves(&mut self, ids: Vec<WorkItemId>, sprint: &Sprint) -> Vec<Command> {
        self.view = ViewState::List;
        if ids.is_empty() {
            return Vec::new();
        }
        let operation = self.next_operation_id();
        self.pending_moves.insert(
            operation,
            PendingMove {
                iteration_path: sprint.path.clone(),
                sprint_name: sprint.name.clone(),
                operation_count: ids.len(),
                received: 0,
                failures: 0,
            },
        );
        tracing::debug!(
            "Move operation {}: {:?} -> {}",
            operation,
            ids,
            sprint.path
        );
        ids.into_iter()
            .map(|id| Command::MoveToSprint {
                operation,
                id,
                iteration_path: sprint.path.clone(),
            })
            .collect()
    }
}
