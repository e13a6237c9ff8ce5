//! In-memory backend for `--dummy` runs and tests.

use super::{Backend, BackendError, BackendResult, NewWorkItem, TypeStates, WorkItemUpdate};
use crate::data::{
    category_of, Comment, Sprint, SprintSlots, StateCategories, StateCategory, WorkItem,
    WorkItemId,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DUMMY_USER: &str = "Dummy User";

/// A mutation the dummy backend has accepted, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummyCall {
    UpdateState(WorkItemId, String),
    Update(WorkItemId, WorkItemUpdate),
    Create(NewWorkItem),
    Delete(WorkItemId),
    Move(WorkItemId, String),
}

struct DummyState {
    items: Vec<WorkItem>,
    next_id: WorkItemId,
    calls: Vec<DummyCall>,
    failing: HashSet<WorkItemId>,
}

pub struct DummyBackend {
    project: String,
    sprints: SprintSlots,
    state: Mutex<DummyState>,
}

fn state_table() -> Vec<(&'static str, StateCategory)> {
    vec![
        ("New", StateCategory::Proposed),
        ("Active", StateCategory::InProgress),
        ("Resolved", StateCategory::InProgress),
        ("Closed", StateCategory::Completed),
        ("Removed", StateCategory::Removed),
    ]
}

fn categories() -> StateCategories {
    state_table()
        .into_iter()
        .map(|(name, category)| (name.to_string(), category))
        .collect()
}

impl DummyBackend {
    pub fn new(project: &str, sprints: SprintSlots, items: Vec<WorkItem>) -> Self {
        let next_id = items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        Self {
            project: project.to_string(),
            sprints,
            state: Mutex::new(DummyState {
                items,
                next_id,
                calls: Vec::new(),
                failing: HashSet::new(),
            }),
        }
    }

    /// Three sprints, a hierarchy with completed items, enough current-sprint
    /// items to page, plus recent and stale backlog items.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let project = "Hippo";
        let sprint = |n: i64, offset_weeks: i64| {
            let start = now + Duration::weeks(offset_weeks * 2) - Duration::days(3);
            Sprint {
                name: format!("Sprint {n}"),
                path: format!("{project}\\Sprint {n}"),
                start_date: Some(start),
                end_date: Some(start + Duration::days(13)),
            }
        };
        let sprints = SprintSlots {
            previous: Some(sprint(41, -1)),
            current: Some(sprint(42, 0)),
            next: Some(sprint(43, 1)),
        };
        let current = format!("{project}\\Sprint 42");
        let previous = format!("{project}\\Sprint 41");
        let next = format!("{project}\\Sprint 43");

        let mut items = vec![
            seed(100, "Checkout redesign", "User Story", "Active", &current, None, now),
            seed(101, "Build payment form", "Task", "Active", &current, Some(100), now),
            seed(102, "Write API contract", "Task", "Closed", &current, Some(100), now),
            seed(103, "Wire up validation", "Task", "New", &current, Some(100), now),
            seed(104, "Unit tests for validators", "Task", "Closed", &current, Some(103), now),
            seed(110, "Login fails on Safari", "Bug", "Active", &current, None, now),
            seed(111, "Reproduce on iOS 17", "Task", "Resolved", &current, Some(110), now),
        ];
        items[0].description =
            "<p>Rework the <b>checkout</b> flow.</p><ul><li>One page</li><li>Saved cards</li></ul>"
                .to_string();
        items[0].comments = vec![Comment {
            author: DUMMY_USER.to_string(),
            text: "Design review on Thursday".to_string(),
            created_date: Some(now - Duration::days(1)),
        }];

        for n in 0..45 {
            let state = if n % 7 == 0 { "Closed" } else { "New" };
            items.push(seed(
                200 + n,
                &format!("Chore #{n}: tidy module {}", n % 9),
                "Task",
                state,
                &current,
                None,
                now - Duration::hours(n),
            ));
        }

        items.push(seed(300, "Release notes", "Task", "Closed", &previous, None, now));
        items.push(seed(
            301,
            "Migrate CI runners",
            "Task",
            "Active",
            &previous,
            None,
            now - Duration::days(20),
        ));
        items.push(seed(400, "Plan Q3 roadmap", "Epic", "New", &next, None, now));

        items.push(seed(500, "Dark mode", "User Story", "New", project, None, now - Duration::days(2)));
        items.push(seed(501, "CSV export", "User Story", "New", project, None, now - Duration::days(5)));
        items.push(seed(
            502,
            "Old spike: GraphQL",
            "Task",
            "Active",
            project,
            None,
            now - Duration::days(60),
        ));

        Self::new(project, sprints, items)
    }

    fn lock(&self) -> MutexGuard<'_, DummyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every mutation of `id` fail.
    pub fn fail_on(&self, id: WorkItemId) {
        self.lock().failing.insert(id);
    }

    pub fn calls(&self) -> Vec<DummyCall> {
        self.lock().calls.clone()
    }

    pub fn items(&self) -> Vec<WorkItem> {
        self.lock().items.clone()
    }

    fn current_path(&self) -> &str {
        self.sprints
            .current
            .as_ref()
            .map(|s| s.path.as_str())
            .unwrap_or("")
    }

    fn select(
        &self,
        exclude: &[WorkItemId],
        limit: Option<usize>,
        filter: impl Fn(&WorkItem) -> bool,
        newest_first: bool,
    ) -> Vec<WorkItem> {
        let state = self.lock();
        let mut found: Vec<WorkItem> = state
            .items
            .iter()
            .filter(|i| !exclude.contains(&i.id) && filter(i))
            .cloned()
            .collect();
        if newest_first {
            found.sort_by(|a, b| b.changed_date.cmp(&a.changed_date));
        }
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        found
    }

    fn is_recent_backlog(&self, item: &WorkItem) -> bool {
        item.iteration_path == self.project && changed_within(item, Duration::days(30))
    }

    fn is_abandoned(&self, item: &WorkItem, current_sprint_path: &str) -> bool {
        let open = !matches!(
            category_of(&categories(), &item.state),
            StateCategory::Completed | StateCategory::Removed
        );
        open && !changed_within(item, Duration::days(14)) && item.iteration_path != current_sprint_path
    }

    fn mutate<T>(
        &self,
        id: WorkItemId,
        call: DummyCall,
        apply: impl FnOnce(&mut WorkItem) -> T,
    ) -> BackendResult<T> {
        let mut state = self.lock();
        if state.failing.contains(&id) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("simulated failure for #{id}"),
            });
        }
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(BackendError::NotFound(id))?;
        let result = apply(item);
        item.changed_date = Some(Utc::now());
        state.calls.push(call);
        Ok(result)
    }
}

fn changed_within(item: &WorkItem, window: Duration) -> bool {
    item.changed_date
        .map(|changed| changed >= Utc::now() - window)
        .unwrap_or(false)
}

fn seed(
    id: WorkItemId,
    title: &str,
    work_item_type: &str,
    state: &str,
    iteration_path: &str,
    parent_id: Option<WorkItemId>,
    changed: DateTime<Utc>,
) -> WorkItem {
    WorkItem {
        id,
        title: title.to_string(),
        state: state.to_string(),
        work_item_type: work_item_type.to_string(),
        assigned_to: Some(DUMMY_USER.to_string()),
        priority: Some(2),
        created_date: Some(changed - Duration::days(1)),
        changed_date: Some(changed),
        iteration_path: iteration_path.to_string(),
        area_path: "Hippo".to_string(),
        parent_id,
        ..Default::default()
    }
}

#[async_trait]
impl Backend for DummyBackend {
    async fn get_work_item_by_id(&self, id: WorkItemId) -> BackendResult<WorkItem> {
        self.lock()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(BackendError::NotFound(id))
    }

    async fn get_work_items_excluding(
        &self,
        exclude: &[WorkItemId],
        sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        Ok(self.select(
            exclude,
            Some(limit),
            |i| sprint_path.is_empty() || i.iteration_path == sprint_path,
            false,
        ))
    }

    async fn get_work_items_count_for_sprint(&self, sprint_path: &str) -> BackendResult<usize> {
        Ok(self
            .select(
                &[],
                None,
                |i| sprint_path.is_empty() || i.iteration_path == sprint_path,
                false,
            )
            .len())
    }

    async fn get_recent_backlog_items_excluding(
        &self,
        exclude: &[WorkItemId],
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        Ok(self.select(exclude, Some(limit), |i| self.is_recent_backlog(i), true))
    }

    async fn get_recent_backlog_items_count(&self) -> BackendResult<usize> {
        Ok(self
            .select(&[], None, |i| self.is_recent_backlog(i), true)
            .len())
    }

    async fn get_abandoned_work_items_excluding(
        &self,
        exclude: &[WorkItemId],
        current_sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        Ok(self.select(
            exclude,
            Some(limit),
            |i| self.is_abandoned(i, current_sprint_path),
            false,
        ))
    }

    async fn get_abandoned_work_items_count(
        &self,
        current_sprint_path: &str,
    ) -> BackendResult<usize> {
        Ok(self
            .select(&[], None, |i| self.is_abandoned(i, current_sprint_path), false)
            .len())
    }

    async fn search_assigned_to_me(
        &self,
        query: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        let needle = query.trim().to_lowercase();
        let categories = categories();
        Ok(self.select(
            &[],
            Some(limit),
            |i| {
                i.assigned_to.as_deref() == Some(DUMMY_USER)
                    && category_of(&categories, &i.state) != StateCategory::Completed
                    && i.title.to_lowercase().contains(&needle)
            },
            true,
        ))
    }

    async fn update_work_item_state(&self, id: WorkItemId, new_state: &str) -> BackendResult<()> {
        self.mutate(id, DummyCall::UpdateState(id, new_state.to_string()), |item| {
            item.state = new_state.to_string();
        })
    }

    async fn update_work_item(
        &self,
        id: WorkItemId,
        update: &WorkItemUpdate,
    ) -> BackendResult<()> {
        self.mutate(id, DummyCall::Update(id, update.clone()), |item| {
            if let Some(title) = &update.title {
                item.title = title.clone();
            }
            if let Some(description) = &update.description {
                item.description = description.clone();
            }
        })
    }

    async fn create_work_item(&self, new_item: &NewWorkItem) -> BackendResult<WorkItem> {
        if new_item.title.trim().is_empty() {
            return Err(BackendError::Invalid("title must not be empty".to_string()));
        }
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        let now = Utc::now();
        let item = WorkItem {
            id,
            title: new_item.title.trim().to_string(),
            state: "New".to_string(),
            work_item_type: new_item.work_item_type.clone(),
            assigned_to: Some(DUMMY_USER.to_string()),
            created_date: Some(now),
            changed_date: Some(now),
            iteration_path: new_item
                .iteration_path
                .clone()
                .unwrap_or_else(|| self.project.clone()),
            area_path: new_item
                .area_path
                .clone()
                .unwrap_or_else(|| self.project.clone()),
            parent_id: new_item.parent_id,
            ..Default::default()
        };
        state.items.push(item.clone());
        state.calls.push(DummyCall::Create(new_item.clone()));
        Ok(item)
    }

    async fn delete_work_item(&self, id: WorkItemId) -> BackendResult<()> {
        let mut state = self.lock();
        if state.failing.contains(&id) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("simulated failure for #{id}"),
            });
        }
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if state.items.len() == before {
            return Err(BackendError::NotFound(id));
        }
        state.calls.push(DummyCall::Delete(id));
        Ok(())
    }

    async fn move_work_item_to_sprint(
        &self,
        id: WorkItemId,
        iteration_path: &str,
    ) -> BackendResult<()> {
        self.mutate(id, DummyCall::Move(id, iteration_path.to_string()), |item| {
            item.iteration_path = iteration_path.to_string();
        })
    }

    async fn get_work_item_type_states(&self, _work_item_type: &str) -> BackendResult<TypeStates> {
        let table = state_table();
        Ok(TypeStates {
            states: table.iter().map(|(name, _)| name.to_string()).collect(),
            categories: categories(),
        })
    }

    async fn get_current_and_adjacent_sprints(&self) -> BackendResult<SprintSlots> {
        Ok(self.sprints.clone())
    }

    fn web_url(&self, id: WorkItemId) -> Option<String> {
        Some(format!("https://example.invalid/{}/_workitems/edit/{id}", self.project))
    }
}

impl std::fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyBackend")
            .field("project", &self.project)
            .field("current", &self.current_path())
            .finish()
    }
}
