//! Deferred backend work.
//!
//! `App::update` never talks to the backend; it returns `Command` values.
//! The runtime executes each one on a worker task and feeds the resulting
//! message back into the loop.

use super::message::{Message, Outcome};
use crate::backend::{Backend, BackendResult, NewWorkItem, WorkItemUpdate};
use crate::data::{BacklogTab, ListKey, WorkItem, WorkItemId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadSprints {
        force_reload: bool,
    },
    /// Load a page for `target`. With `exclude` set, the page is appended.
    LoadTasks {
        target: ListKey,
        generation: u64,
        /// Sprint path of a sprint tab, or the current sprint for backlog tabs
        sprint_path: String,
        exclude: Option<Vec<WorkItemId>>,
        limit: usize,
    },
    /// Server-side search of items assigned to the user; replaces `target`.
    Find {
        target: ListKey,
        generation: u64,
        sprint_path: String,
        query: String,
        limit: usize,
    },
    LoadStates {
        work_item_type: String,
    },
    UpdateState {
        id: WorkItemId,
        state: String,
    },
    UpdateWorkItem {
        id: WorkItemId,
        update: WorkItemUpdate,
    },
    RefreshWorkItem {
        id: WorkItemId,
    },
    CreateWorkItem {
        target: ListKey,
        new_item: NewWorkItem,
    },
    DeleteWorkItem {
        id: WorkItemId,
    },
    MoveToSprint {
        operation: u64,
        id: WorkItemId,
        iteration_path: String,
    },
    OpenInBrowser {
        id: WorkItemId,
    },
}

fn outcome<T>(result: BackendResult<T>) -> Outcome<T> {
    result.map_err(|e| e.to_string())
}

impl Command {
    /// Run against `backend`. Never fails: errors travel inside the message.
    pub async fn execute(self, backend: Arc<dyn Backend>) -> Message {
        tracing::debug!("Executing {:?}", self);
        match self {
            Command::LoadSprints { force_reload } => Message::SprintsLoaded {
                result: outcome(backend.get_current_and_adjacent_sprints().await),
                force_reload,
            },
            Command::LoadTasks {
                target,
                generation,
                sprint_path,
                exclude,
                limit,
            } => {
                let append = exclude.is_some();
                let result = match exclude {
                    Some(exclude) => load_more(&*backend, target, &sprint_path, &exclude, limit)
                        .await
                        .map(|items| (items, 0)),
                    None => load_page(&*backend, target, &sprint_path, limit).await,
                };
                Message::TasksLoaded {
                    target,
                    generation,
                    append,
                    sprint_path,
                    result: outcome(result),
                }
            }
            Command::Find {
                target,
                generation,
                sprint_path,
                query,
                limit,
            } => {
                let result = backend
                    .search_assigned_to_me(&query, limit)
                    .await
                    .map(|items| {
                        let total = items.len();
                        (items, total)
                    });
                Message::TasksLoaded {
                    target,
                    generation,
                    append: false,
                    sprint_path,
                    result: outcome(result),
                }
            }
            Command::LoadStates { work_item_type } => {
                let result = outcome(backend.get_work_item_type_states(&work_item_type).await);
                Message::StatesLoaded {
                    work_item_type,
                    result,
                }
            }
            Command::UpdateState { id, state } => {
                let result = outcome(backend.update_work_item_state(id, &state).await);
                Message::StateUpdated { id, state, result }
            }
            Command::UpdateWorkItem { id, update } => Message::WorkItemUpdated {
                id,
                result: outcome(backend.update_work_item(id, &update).await),
            },
            Command::RefreshWorkItem { id } => Message::WorkItemRefreshed {
                id,
                result: outcome(backend.get_work_item_by_id(id).await),
            },
            Command::CreateWorkItem { target, new_item } => Message::WorkItemCreated {
                target,
                result: outcome(backend.create_work_item(&new_item).await),
            },
            Command::DeleteWorkItem { id } => Message::WorkItemDeleted {
                id,
                result: outcome(backend.delete_work_item(id).await),
            },
            Command::MoveToSprint {
                operation,
                id,
                iteration_path,
            } => Message::SprintUpdated {
                operation,
                id,
                result: outcome(backend.move_work_item_to_sprint(id, &iteration_path).await),
            },
            Command::OpenInBrowser { id } => {
                let result = match backend.web_url(id) {
                    Some(url) => open_url(&url).map_err(|e| e.to_string()),
                    None => Err(format!("no web address for #{id}")),
                };
                Message::BrowserOpened { result }
            }
        }
    }
}

/// First page plus the total count for the tab.
async fn load_page(
    backend: &dyn Backend,
    target: ListKey,
    sprint_path: &str,
    limit: usize,
) -> BackendResult<(Vec<WorkItem>, usize)> {
    match target {
        ListKey::Sprint(_) => {
            futures::try_join!(
                backend.get_work_items_excluding(&[], sprint_path, limit),
                backend.get_work_items_count_for_sprint(sprint_path),
            )
        }
        ListKey::Backlog(BacklogTab::Recent) => {
            futures::try_join!(
                backend.get_recent_backlog_items(limit),
                backend.get_recent_backlog_items_count(),
            )
        }
        ListKey::Backlog(BacklogTab::Abandoned) => {
            futures::try_join!(
                backend.get_abandoned_work_items(sprint_path, limit),
                backend.get_abandoned_work_items_count(sprint_path),
            )
        }
    }
}

async fn load_more(
    backend: &dyn Backend,
    target: ListKey,
    sprint_path: &str,
    exclude: &[WorkItemId],
    limit: usize,
) -> BackendResult<Vec<WorkItem>> {
    match target {
        ListKey::Sprint(_) => {
            backend
                .get_work_items_excluding(exclude, sprint_path, limit)
                .await
        }
        ListKey::Backlog(BacklogTab::Recent) => {
            backend
                .get_recent_backlog_items_excluding(exclude, limit)
                .await
        }
        ListKey::Backlog(BacklogTab::Abandoned) => {
            backend
                .get_abandoned_work_items_excluding(exclude, sprint_path, limit)
                .await
        }
    }
}

fn open_url(url: &str) -> std::io::Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    std::process::Command::new(opener)
        .arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .or_else(|_| {
            // Fallback to wslview for WSL
            std::process::Command::new("wslview").arg(url).spawn()
        })?;
    Ok(())
}
