//! Remote work item backend: the contract the TUI consumes, plus the Azure
//! DevOps REST implementation and an in-memory stand-in.

pub mod azure;
pub mod dummy;

pub use azure::AzureDevOps;
pub use dummy::{DummyBackend, DummyCall};

use crate::data::{SprintSlots, StateCategories, WorkItem, WorkItemId};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Shared HTTP client for all API requests to enable connection pooling
pub static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()
        .expect("Failed to create HTTP client")
});

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("work item #{0} not found")]
    NotFound(WorkItemId),
    #[error("{0}")]
    Invalid(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Changed subset of editable fields. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl WorkItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Field reference names and their new values.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = Vec::new();
        if let Some(title) = &self.title {
            fields.push(("System.Title", title.as_str()));
        }
        if let Some(description) = &self.description {
            fields.push(("System.Description", description.as_str()));
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkItem {
    pub title: String,
    pub work_item_type: String,
    pub iteration_path: Option<String>,
    pub parent_id: Option<WorkItemId>,
    pub area_path: Option<String>,
}

/// States of one work item type, in workflow order, with their categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeStates {
    pub states: Vec<String>,
    pub categories: StateCategories,
}

/// Everything the TUI needs from the remote tracker.
///
/// An empty `sprint_path` means "any iteration".
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_work_item_by_id(&self, id: WorkItemId) -> BackendResult<WorkItem>;

    async fn get_work_items_excluding(
        &self,
        exclude: &[WorkItemId],
        sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>>;

    async fn get_work_items_count_for_sprint(&self, sprint_path: &str) -> BackendResult<usize>;

    /// Not in any sprint, changed within the last 30 days.
    async fn get_recent_backlog_items(&self, limit: usize) -> BackendResult<Vec<WorkItem>> {
        self.get_recent_backlog_items_excluding(&[], limit).await
    }

    async fn get_recent_backlog_items_excluding(
        &self,
        exclude: &[WorkItemId],
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>>;

    async fn get_recent_backlog_items_count(&self) -> BackendResult<usize>;

    /// Not changed within the last 14 days, outside the current sprint.
    async fn get_abandoned_work_items(
        &self,
        current_sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        self.get_abandoned_work_items_excluding(&[], current_sprint_path, limit)
            .await
    }

    async fn get_abandoned_work_items_excluding(
        &self,
        exclude: &[WorkItemId],
        current_sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>>;

    async fn get_abandoned_work_items_count(&self, current_sprint_path: &str)
        -> BackendResult<usize>;

    /// Open items assigned to the signed-in user whose title contains `query`.
    async fn search_assigned_to_me(&self, query: &str, limit: usize)
        -> BackendResult<Vec<WorkItem>>;

    async fn update_work_item_state(&self, id: WorkItemId, new_state: &str) -> BackendResult<()>;

    async fn update_work_item(&self, id: WorkItemId, update: &WorkItemUpdate)
        -> BackendResult<()>;

    async fn create_work_item(&self, new_item: &NewWorkItem) -> BackendResult<WorkItem>;

    async fn delete_work_item(&self, id: WorkItemId) -> BackendResult<()>;

    async fn move_work_item_to_sprint(
        &self,
        id: WorkItemId,
        iteration_path: &str,
    ) -> BackendResult<()>;

    async fn get_work_item_type_states(&self, work_item_type: &str) -> BackendResult<TypeStates>;

    async fn get_current_and_adjacent_sprints(&self) -> BackendResult<SprintSlots>;

    /// Browser URL for an item, if the backend has one.
    fn web_url(&self, _id: WorkItemId) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_fields_only_changed() {
        let update = WorkItemUpdate {
            title: Some("New title".to_string()),
            description: None,
        };
        assert_eq!(update.fields(), vec![("System.Title", "New title")]);
        assert!(!update.is_empty());
        assert!(WorkItemUpdate::default().is_empty());
    }

    #[test]
    fn test_backend_error_messages() {
        let err = BackendError::Status {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "server returned 401: Unauthorized");
        assert_eq!(BackendError::NotFound(7).to_string(), "work item #7 not found");
    }
}
