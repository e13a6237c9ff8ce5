//! Folding command results back into the model.

use super::app::{App, ViewState};
use super::command::Command;
use super::message::Outcome;
use crate::backend::TypeStates;
use crate::data::{BacklogTab, ListKey, SprintSlots, SprintTab, WorkItem, WorkItemId};

impl App {
    pub(crate) fn on_sprints_loaded(
        &mut self,
        result: Outcome<SprintSlots>,
        force_reload: bool,
    ) -> Vec<Command> {
        let slots = match result {
            Ok(slots) => slots,
            Err(e) => {
                let text = format!("Could not load sprints: {e}");
                tracing::warn!("{}", text);
                self.set_status(text.clone());
                if self.view == ViewState::Loading {
                    self.view = ViewState::Error(text);
                }
                return Vec::new();
            }
        };

        let previous = std::mem::replace(&mut self.sprints, slots);
        for tab in SprintTab::all() {
            if force_reload || previous.path(tab) != self.sprints.path(tab) {
                self.lists.get_mut(ListKey::Sprint(tab)).reset();
            }
        }
        if force_reload
            || previous.path(SprintTab::Current) != self.sprints.path(SprintTab::Current)
        {
            self.lists
                .get_mut(ListKey::Backlog(BacklogTab::Abandoned))
                .reset();
        }

        match self.sprints.current.as_ref() {
            Some(current) => tracing::info!("Current sprint: {}", current.path),
            None => tracing::warn!("No current sprint"),
        }
        if force_reload {
            self.log_action("Sprints reloaded");
        }

        let key = self.current_key();
        if self
            .lists
            .get(key)
            .is_some_and(crate::data::WorkItemList::attempted)
        {
            Vec::new()
        } else {
            self.load_list(key)
        }
    }

    pub(crate) fn on_tasks_loaded(
        &mut self,
        target: ListKey,
        generation: u64,
        append: bool,
        sprint_path: &str,
        result: Outcome<(Vec<WorkItem>, usize)>,
    ) -> Vec<Command> {
        let list = self.lists.get_mut(target);
        if generation != list.generation() {
            tracing::debug!(
                "Dropping stale page for {:?} (generation {} != {})",
                target,
                generation,
                list.generation()
            );
            return Vec::new();
        }
        if let ListKey::Sprint(tab) = target {
            if self.sprints.path(tab).unwrap_or("") != sprint_path {
                tracing::debug!("Dropping page for replaced sprint {}", sprint_path);
                return Vec::new();
            }
        }

        let list = self.lists.get_mut(target);
        let (items, total) = match result {
            Ok(page) => page,
            Err(e) => {
                list.load_failed();
                let text = format!("Failed to load {}: {e}", target.label());
                tracing::warn!("{}", text);
                self.set_status(text.clone());
                if self.view == ViewState::Loading && target == self.current_key() {
                    self.view = ViewState::Error(text);
                }
                return Vec::new();
            }
        };

        if append {
            list.append(items);
        } else {
            list.replace(items, total);
            list.reset_cursor();
        }

        let h = self.content_height();
        if let Some((key, id)) = self.pending_created {
            if key == target {
                let list = self.lists.get_mut(target);
                if let Some(row) = list.row_of(id) {
                    list.set_cursor(row, h);
                }
                self.pending_created = None;
            }
        }

        if self.view == ViewState::Loading && target == self.current_key() {
            self.view = ViewState::List;
        }

        let types: Vec<String> = self
            .lists
            .get_mut(target)
            .tasks()
            .iter()
            .map(|t| t.work_item_type.clone())
            .collect();
        self.request_states(types.iter().map(String::as_str))
    }

    pub(crate) fn on_states_loaded(
        &mut self,
        work_item_type: String,
        result: Outcome<TypeStates>,
    ) -> Vec<Command> {
        let requested = self
            .pending_picker
            .as_ref()
            .is_some_and(|p| p.work_item_type == work_item_type);
        // Only reopen on the screen that asked; otherwise just merge the states
        let pending = requested
            .then(|| self.pending_picker.take())
            .flatten()
            .filter(|p| self.view.is_same_screen(&p.origin));

        match result {
            Ok(type_states) => {
                self.state_categories.extend(type_states.categories);
                self.type_states
                    .insert(work_item_type.clone(), type_states.states);
                if let Some(pending) = pending {
                    self.show_state_picker(pending.targets, work_item_type, pending.batch);
                }
            }
            Err(e) => {
                self.forget_requested_type(&work_item_type);
                self.set_status(format!("Could not load states for {work_item_type}: {e}"));
            }
        }
        Vec::new()
    }

    pub(crate) fn on_state_updated(
        &mut self,
        id: WorkItemId,
        state: &str,
        result: Outcome<()>,
    ) -> Vec<Command> {
        match result {
            Ok(()) => {
                self.log_action(format!("#{id} set to {state}"));
                vec![Command::RefreshWorkItem { id }]
            }
            Err(e) => {
                self.set_status(format!("Failed to update #{id}: {e}"));
                Vec::new()
            }
        }
    }

    pub(crate) fn on_work_item_updated(
        &mut self,
        id: WorkItemId,
        result: Outcome<()>,
    ) -> Vec<Command> {
        match result {
            Ok(()) => {
                self.log_action(format!("Saved #{id}"));
                vec![Command::RefreshWorkItem { id }]
            }
            Err(e) => {
                self.set_status(format!("Failed to save #{id}: {e}"));
                Vec::new()
            }
        }
    }

    pub(crate) fn on_work_item_refreshed(&mut self, id: WorkItemId, result: Outcome<WorkItem>) {
        match result {
            Ok(item) => {
                let updated = self.lists.update_everywhere(&item);
                tracing::debug!("Refreshed #{} in {} list(s)", id, updated);
            }
            Err(e) => self.set_status(format!("Could not refresh #{id}: {e}")),
        }
    }

    pub(crate) fn on_work_item_created(
        &mut self,
        target: ListKey,
        result: Outcome<WorkItem>,
    ) -> Vec<Command> {
        match result {
            Ok(item) => {
                self.log_action(format!("Created #{} {}", item.id, item.title));
                self.pending_created = Some((target, item.id));
                let mut commands = self.request_states([item.work_item_type.as_str()]);
                commands.extend(self.load_list(target));
                commands
            }
            Err(e) => {
                self.view = ViewState::Error(format!("Could not create work item: {e}"));
                Vec::new()
            }
        }
    }

    pub(crate) fn on_work_item_deleted(&mut self, id: WorkItemId, result: Outcome<()>) {
        match result {
            Ok(()) => {
                self.lists.remove_everywhere(id);
                self.selection.remove(&id);
                if matches!(self.view, ViewState::Detail { id: shown, .. } if shown == id) {
                    self.view = ViewState::List;
                }
                self.log_action(format!("Deleted #{id}"));
            }
            Err(e) => self.set_status(format!("Failed to delete #{id}: {e}")),
        }
    }

    pub(crate) fn on_sprint_updated(
        &mut self,
        operation: u64,
        id: WorkItemId,
        result: Outcome<()>,
    ) -> Vec<Command> {
        let Some(pending) = self.pending_moves.get_mut(&operation) else {
            tracing::debug!("Result for unknown move operation {}", operation);
            return Vec::new();
        };
        pending.received += 1;
        let target = self
            .sprints
            .tab_for_path(&pending.iteration_path)
            .map(ListKey::Sprint);

        match result {
            Ok(()) => {
                let keys: Vec<ListKey> = self.lists.keys().copied().collect();
                for key in keys.into_iter().filter(|k| Some(*k) != target) {
                    self.lists.get_mut(key).remove(id);
                }
            }
            Err(e) => {
                pending.failures += 1;
                self.set_status(format!("Failed to move #{id}: {e}"));
            }
        }

        let Some(pending) = self.pending_moves.get(&operation) else {
            return Vec::new();
        };
        if pending.received < pending.operation_count {
            return Vec::new();
        }
        let Some(done) = self.pending_moves.remove(&operation) else {
            return Vec::new();
        };

        let moved = done.operation_count - done.failures;
        let text = if done.failures == 0 {
            format!("Moved {moved} item(s) to {}", done.sprint_name)
        } else {
            format!(
                "Moved {moved} of {} item(s) to {} ({} failed)",
                done.operation_count, done.sprint_name, done.failures
            )
        };
        self.set_status(text.clone());
        self.log_action(text);

        match target {
            Some(key) if key == self.current_key() => self.load_list(key),
            Some(key) => {
                self.lists.get_mut(key).reset();
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}
