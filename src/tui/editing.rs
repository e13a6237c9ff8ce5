//! Edit, create, delete, filter and find flows.

use super::app::{App, ViewState};
use super::command::Command;
use super::forms::{CreateForm, DeleteTarget, EditForm, TextInput};
use crate::backend::NewWorkItem;
use crate::data::{ListKey, PAGE_SIZE};
use crate::util::html_to_text;

/// Type given to items created as children.
pub const CHILD_TYPE: &str = "Task";

impl App {
    pub(crate) fn open_filter(&mut self) {
        let query = self
            .current_list()
            .map(|l| l.filter_query().to_string())
            .unwrap_or_default();
        self.view = ViewState::Filter(TextInput::new(&query));
    }

    pub(crate) fn submit_find(&mut self) -> Vec<Command> {
        let ViewState::Find(input) = std::mem::replace(&mut self.view, ViewState::List) else {
            return Vec::new();
        };
        let query = input.value().trim().to_string();
        if query.is_empty() {
            return Vec::new();
        }

        let target = self.current_key();
        let sprint_path = self.sprint_path_for(target).unwrap_or_default();
        let generation = self.lists.get_mut(target).begin_load();
        self.begin_operation();
        self.set_status(format!("Searching for \"{query}\""));
        vec![Command::Find {
            target,
            generation,
            sprint_path,
            query,
            limit: PAGE_SIZE,
        }]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edit
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn open_edit(&mut self) {
        let Some(item) = self.focused_item_id().and_then(|id| self.find_item(id)) else {
            return;
        };
        let form = EditForm::new(item.id, &item.title, &html_to_text(&item.description));
        self.view = ViewState::Edit(form);
    }

    pub(crate) fn submit_edit(&mut self) -> Vec<Command> {
        let ViewState::Edit(form) = &mut self.view else {
            return Vec::new();
        };
        if form.title.is_blank() {
            form.error = Some("Title cannot be empty".to_string());
            return Vec::new();
        }

        let id = form.id;
        let update = form.changes();
        self.view = ViewState::Detail { id, scroll: 0 };
        if update.is_empty() {
            self.set_status("No changes");
            return Vec::new();
        }
        self.begin_operation();
        self.set_status(format!("Saving #{id}"));
        vec![Command::UpdateWorkItem { id, update }]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the inline create row. `after` places it past the current subtree.
    pub(crate) fn begin_create(&mut self, after: bool) {
        let list_key = self.current_key();
        let iteration_path = match list_key {
            ListKey::Sprint(tab) => self.sprints.path(tab).map(str::to_string),
            ListKey::Backlog(_) => None,
        };

        let mut form = CreateForm {
            list: list_key,
            input: TextInput::default(),
            row: 0,
            depth: 0,
            parent_id: None,
            work_item_type: CHILD_TYPE.to_string(),
            iteration_path,
            area_path: None,
            error: None,
        };

        if let Some(list) = self.current_list() {
            let cursor = list.cursor().min(list.tree().len());
            form.row = cursor;
            if let (Some(row), Some(item)) = (list.row_at(cursor), list.item_at(cursor)) {
                form.area_path = Some(item.area_path.clone()).filter(|a| !a.is_empty());
                if !after {
                    form.depth = row.depth;
                    form.parent_id = item.parent_id;
                    form.work_item_type = item.work_item_type.clone();
                } else if row.has_children {
                    form.row = list.subtree_end(cursor);
                    form.depth = row.depth + 1;
                    form.parent_id = Some(item.id);
                } else {
                    form.row = list.subtree_end(cursor);
                    form.depth = row.depth;
                    form.parent_id = item.parent_id;
                    form.work_item_type = item.work_item_type.clone();
                }
            }
        }

        self.view = ViewState::Create(form);
    }

    pub(crate) fn submit_create(&mut self) -> Vec<Command> {
        let ViewState::Create(form) = &mut self.view else {
            return Vec::new();
        };
        if form.input.is_blank() {
            form.error = Some("Title cannot be empty".to_string());
            return Vec::new();
        }

        let target = form.list;
        let new_item = NewWorkItem {
            title: form.input.value().trim().to_string(),
            work_item_type: form.work_item_type.clone(),
            iteration_path: form.iteration_path.clone(),
            parent_id: form.parent_id,
            area_path: form.area_path.clone(),
        };
        self.view = ViewState::List;
        self.begin_operation();
        self.set_status(format!(
            "Creating {} \"{}\"",
            new_item.work_item_type, new_item.title
        ));
        vec![Command::CreateWorkItem { target, new_item }]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delete
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn open_delete_confirm(&mut self) {
        let target = if self.selection.is_empty() {
            match self.selected_item() {
                Some(item) => DeleteTarget::Single {
                    id: item.id,
                    title: item.title.clone(),
                },
                None => return,
            }
        } else {
            let (ids, _) = self.action_targets();
            DeleteTarget::Batch(ids)
        };
        self.view = ViewState::DeleteConfirm(target);
    }

    pub(crate) fn confirm_delete(&mut self) -> Vec<Command> {
        let ViewState::DeleteConfirm(target) = std::mem::replace(&mut self.view, ViewState::List)
        else {
            return Vec::new();
        };
        self.begin_operation();
        if target.is_batch() {
            self.selection.clear();
        }
        let ids = target.ids();
        match &target {
            DeleteTarget::Single { id, .. } => self.set_status(format!("Deleting #{id}")),
            DeleteTarget::Batch(ids) => self.set_status(format!("Deleting {} items", ids.len())),
        }
        ids.into_iter()
            .map(|id| Command::DeleteWorkItem { id })
            .collect()
    }
}
