//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use hippo::data::{
    ListKey, Sprint, SprintSlots, SprintTab, StateCategory, WorkItem, WorkItemId,
};
use hippo::tui::{dispatch, App, Command, ViewState};

pub const CURRENT: ListKey = ListKey::Sprint(SprintTab::Current);

pub fn sprint(name: &str) -> Sprint {
    Sprint {
        name: name.to_string(),
        path: format!("Proj\\{name}"),
        start_date: None,
        end_date: None,
    }
}

pub fn slots() -> SprintSlots {
    SprintSlots {
        previous: Some(sprint("Sprint 1")),
        current: Some(sprint("Sprint 2")),
        next: Some(sprint("Sprint 3")),
    }
}

pub fn item(id: WorkItemId, state: &str, parent_id: Option<WorkItemId>) -> WorkItem {
    WorkItem {
        id,
        title: format!("Item {id}"),
        state: state.to_string(),
        work_item_type: "Task".to_string(),
        iteration_path: "Proj\\Sprint 2".to_string(),
        parent_id,
        ..Default::default()
    }
}

pub fn items(ids: impl IntoIterator<Item = WorkItemId>) -> Vec<WorkItem> {
    ids.into_iter().map(|id| item(id, "Active", None)).collect()
}

/// App on the current sprint tab with `tasks` loaded out of `total`.
pub fn app_with(tasks: Vec<WorkItem>, total: usize) -> App {
    let mut app = App::new("org / Proj / Proj Team");
    app.height = 40;
    app.sprints = slots();
    app.state_categories
        .insert("Closed".to_string(), StateCategory::Completed);
    app.state_categories
        .insert("Active".to_string(), StateCategory::InProgress);
    let list = app.lists.get_mut(CURRENT);
    list.begin_load();
    list.replace(tasks, total);
    app.view = ViewState::List;
    app
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

pub fn ctrl(c: char) -> KeyEvent {
    KeyEvent {
        modifiers: KeyModifiers::CONTROL,
        ..key(KeyCode::Char(c))
    }
}

/// Dispatch a key press and apply it.
pub fn press(app: &mut App, code: KeyCode) -> Vec<Command> {
    let msg = dispatch(app, key(code));
    app.update(msg)
}

pub fn press_char(app: &mut App, c: char) -> Vec<Command> {
    press(app, KeyCode::Char(c))
}

pub fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press_char(app, c);
    }
}

/// Move the cursor onto the row showing `id`.
pub fn focus(app: &mut App, id: WorkItemId) {
    let h = app.content_height();
    let list = app.current_list_mut();
    let row = list.row_of(id).expect("item is visible");
    list.set_cursor(row, h);
}

pub fn moved_ids(commands: &[Command]) -> Vec<WorkItemId> {
    let mut ids: Vec<WorkItemId> = commands
        .iter()
        .filter_map(|c| match c {
            Command::MoveToSprint { id, .. } => Some(*id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids
}
