//! Azure DevOps REST client.
//!
//! Reads go through WIQL (ids only) followed by a work items batch request;
//! writes use JSON-patch documents.

use super::{
    Backend, BackendError, BackendResult, NewWorkItem, TypeStates, WorkItemUpdate, HTTP_CLIENT,
};
use crate::data::{Comment, Sprint, SprintSlots, StateCategory, WorkItem, WorkItemId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;

const API_VERSION: &str = "7.0";
const COMMENTS_API_VERSION: &str = "7.0-preview.3";
/// Upper bound of the work items batch endpoint.
const BATCH_LIMIT: usize = 200;
const PARENT_LINK: &str = "System.LinkTypes.Hierarchy-Reverse";
const CLOSED_STATES: &str = "('Closed', 'Done', 'Removed')";

const FIELDS: &[&str] = &[
    "System.Id",
    "System.Title",
    "System.Description",
    "System.State",
    "System.WorkItemType",
    "System.AssignedTo",
    "System.Tags",
    "Microsoft.VSTS.Common.Priority",
    "System.CreatedDate",
    "System.ChangedDate",
    "System.IterationPath",
    "System.AreaPath",
    "System.Parent",
];

pub struct AzureDevOps {
    organization_url: String,
    project: String,
    team: String,
    token: String,
}

impl AzureDevOps {
    pub fn new(organization_url: &str, project: &str, team: &str, token: String) -> Self {
        Self {
            organization_url: organization_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            team: team.to_string(),
            token,
        }
    }

    fn project_url(&self, path: &str) -> String {
        format!(
            "{}/{}/_apis/{}",
            self.organization_url,
            urlencoding::encode(&self.project),
            path
        )
    }

    fn team_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/_apis/{}",
            self.organization_url,
            urlencoding::encode(&self.project),
            urlencoding::encode(&self.team),
            path
        )
    }

    fn relation_url_base(&self) -> String {
        format!("{}/_apis/wit/workItems", self.organization_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        HTTP_CLIENT
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Azure DevOps API error: {}", status);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Send a JSON-patch document (PATCH to update, POST to create).
    async fn json_patch(&self, method: Method, url: &str, ops: &[Value]) -> BackendResult<Value> {
        let body =
            serde_json::to_string(ops).map_err(|e| BackendError::Invalid(e.to_string()))?;
        self.send(
            self.request(method, url)
                .header("Content-Type", "application/json-patch+json")
                .body(body),
        )
        .await
    }

    async fn query_ids(&self, wiql: &str, top: Option<usize>) -> BackendResult<Vec<WorkItemId>> {
        let mut url = self.team_url(&format!("wit/wiql?api-version={API_VERSION}"));
        if let Some(top) = top {
            url.push_str(&format!("&$top={top}"));
        }
        tracing::debug!("WIQL: {}", wiql);
        let body = self
            .send(self.request(Method::POST, &url).json(&json!({ "query": wiql })))
            .await?;

        Ok(body["workItems"]
            .as_array()
            .map(|items| items.iter().filter_map(|w| w["id"].as_i64()).collect())
            .unwrap_or_default())
    }

    /// Hydrate ids into items, keeping the order of `ids`.
    async fn fetch_items(&self, ids: &[WorkItemId]) -> BackendResult<Vec<WorkItem>> {
        let url = self.project_url(&format!("wit/workitemsbatch?api-version={API_VERSION}"));
        let mut by_id: HashMap<WorkItemId, WorkItem> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(BATCH_LIMIT) {
            let body = self
                .send(
                    self.request(Method::POST, &url)
                        .json(&json!({ "ids": chunk, "fields": FIELDS })),
                )
                .await?;
            for node in body["value"].as_array().into_iter().flatten() {
                let item = parse_work_item(node);
                by_id.insert(item.id, item);
            }
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn query_items(&self, wiql: &str, limit: usize) -> BackendResult<Vec<WorkItem>> {
        let ids = self.query_ids(wiql, Some(limit)).await?;
        self.fetch_items(&ids).await
    }

    async fn query_count(&self, wiql: &str) -> BackendResult<usize> {
        Ok(self.query_ids(wiql, None).await?.len())
    }

    async fn fetch_comments(&self, id: WorkItemId) -> BackendResult<Vec<Comment>> {
        let url = self.project_url(&format!(
            "wit/workItems/{id}/comments?api-version={COMMENTS_API_VERSION}"
        ));
        let body = self.send(self.request(Method::GET, &url)).await?;
        Ok(body["comments"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|c| Comment {
                author: display_name(&c["createdBy"]).unwrap_or_default(),
                text: c["text"].as_str().unwrap_or("").to_string(),
                created_date: parse_date(&c["createdDate"]),
            })
            .collect())
    }
}

#[async_trait]
impl Backend for AzureDevOps {
    async fn get_work_item_by_id(&self, id: WorkItemId) -> BackendResult<WorkItem> {
        let url = self.project_url(&format!(
            "wit/workitems/{id}?api-version={API_VERSION}&$expand=relations"
        ));
        let body = match self.send(self.request(Method::GET, &url)).await {
            Err(BackendError::Status { status: 404, .. }) => {
                return Err(BackendError::NotFound(id))
            }
            other => other?,
        };

        let mut item = parse_work_item(&body);
        match self.fetch_comments(id).await {
            Ok(comments) => item.comments = comments,
            Err(e) => tracing::debug!("Comments for #{} unavailable: {}", id, e),
        }
        Ok(item)
    }

    async fn get_work_items_excluding(
        &self,
        exclude: &[WorkItemId],
        sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        self.query_items(&sprint_query(sprint_path, exclude), limit)
            .await
    }

    async fn get_work_items_count_for_sprint(&self, sprint_path: &str) -> BackendResult<usize> {
        self.query_count(&sprint_query(sprint_path, &[])).await
    }

    async fn get_recent_backlog_items_excluding(
        &self,
        exclude: &[WorkItemId],
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        self.query_items(&recent_backlog_query(&self.project, exclude), limit)
            .await
    }

    async fn get_recent_backlog_items_count(&self) -> BackendResult<usize> {
        self.query_count(&recent_backlog_query(&self.project, &[]))
            .await
    }

    async fn get_abandoned_work_items_excluding(
        &self,
        exclude: &[WorkItemId],
        current_sprint_path: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        self.query_items(&abandoned_query(current_sprint_path, exclude), limit)
            .await
    }

    async fn get_abandoned_work_items_count(
        &self,
        current_sprint_path: &str,
    ) -> BackendResult<usize> {
        self.query_count(&abandoned_query(current_sprint_path, &[]))
            .await
    }

    async fn search_assigned_to_me(
        &self,
        query: &str,
        limit: usize,
    ) -> BackendResult<Vec<WorkItem>> {
        self.query_items(&assigned_to_me_query(query), limit).await
    }

    async fn update_work_item_state(&self, id: WorkItemId, new_state: &str) -> BackendResult<()> {
        let url = self.project_url(&format!("wit/workitems/{id}?api-version={API_VERSION}"));
        self.json_patch(Method::PATCH, &url, &[set_field("System.State", new_state)])
            .await?;
        Ok(())
    }

    async fn update_work_item(
        &self,
        id: WorkItemId,
        update: &WorkItemUpdate,
    ) -> BackendResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let ops: Vec<Value> = update
            .fields()
            .into_iter()
            .map(|(field, value)| set_field(field, value))
            .collect();
        let url = self.project_url(&format!("wit/workitems/{id}?api-version={API_VERSION}"));
        self.json_patch(Method::PATCH, &url, &ops).await?;
        Ok(())
    }

    async fn create_work_item(&self, new_item: &NewWorkItem) -> BackendResult<WorkItem> {
        if new_item.title.trim().is_empty() {
            return Err(BackendError::Invalid("title must not be empty".to_string()));
        }
        let url = self.project_url(&format!(
            "wit/workitems/${}?api-version={API_VERSION}",
            urlencoding::encode(&new_item.work_item_type)
        ));
        let ops = create_document(new_item, &self.relation_url_base());
        let body = self.json_patch(Method::POST, &url, &ops).await?;
        Ok(parse_work_item(&body))
    }

    async fn delete_work_item(&self, id: WorkItemId) -> BackendResult<()> {
        let url = self.project_url(&format!("wit/workitems/{id}?api-version={API_VERSION}"));
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn move_work_item_to_sprint(
        &self,
        id: WorkItemId,
        iteration_path: &str,
    ) -> BackendResult<()> {
        let url = self.project_url(&format!("wit/workitems/{id}?api-version={API_VERSION}"));
        self.json_patch(Method::PATCH, &url, &[set_field("System.IterationPath", iteration_path)])
            .await?;
        Ok(())
    }

    async fn get_work_item_type_states(&self, work_item_type: &str) -> BackendResult<TypeStates> {
        let url = self.project_url(&format!(
            "wit/workitemtypes/{}/states?api-version={API_VERSION}",
            urlencoding::encode(work_item_type)
        ));
        let body = self.send(self.request(Method::GET, &url)).await?;
        Ok(parse_type_states(&body))
    }

    async fn get_current_and_adjacent_sprints(&self) -> BackendResult<SprintSlots> {
        let url = self.team_url(&format!(
            "work/teamsettings/iterations?api-version={API_VERSION}"
        ));
        let body = self.send(self.request(Method::GET, &url)).await?;
        Ok(pick_sprints(&body, Utc::now()))
    }

    fn web_url(&self, id: WorkItemId) -> Option<String> {
        Some(format!(
            "{}/{}/_workitems/edit/{}",
            self.organization_url,
            urlencoding::encode(&self.project),
            id
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WIQL
// ─────────────────────────────────────────────────────────────────────────────

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn exclusion_clause(exclude: &[WorkItemId]) -> String {
    if exclude.is_empty() {
        return String::new();
    }
    let ids: Vec<String> = exclude.iter().map(|id| id.to_string()).collect();
    format!(" AND [System.Id] NOT IN ({})", ids.join(", "))
}

fn sprint_query(sprint_path: &str, exclude: &[WorkItemId]) -> String {
    let iteration = if sprint_path.is_empty() {
        String::new()
    } else {
        format!(" AND [System.IterationPath] = {}", quote(sprint_path))
    };
    format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project{}{} ORDER BY [System.Id] ASC",
        iteration,
        exclusion_clause(exclude)
    )
}

/// Items sitting at the project root iteration (no sprint), recently touched.
fn recent_backlog_query(project: &str, exclude: &[WorkItemId]) -> String {
    format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project \
         AND [System.IterationPath] = {} AND [System.ChangedDate] >= @Today - 30{} \
         ORDER BY [System.ChangedDate] DESC",
        quote(project),
        exclusion_clause(exclude)
    )
}

fn abandoned_query(current_sprint_path: &str, exclude: &[WorkItemId]) -> String {
    let outside_current = if current_sprint_path.is_empty() {
        String::new()
    } else {
        format!(
            " AND [System.IterationPath] <> {}",
            quote(current_sprint_path)
        )
    };
    format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project \
         AND [System.ChangedDate] < @Today - 14 AND [System.State] NOT IN {}{}{} \
         ORDER BY [System.ChangedDate] ASC",
        CLOSED_STATES,
        outside_current,
        exclusion_clause(exclude)
    )
}

fn assigned_to_me_query(search: &str) -> String {
    let search = search.trim();
    let title = if search.is_empty() {
        String::new()
    } else {
        format!(" AND [System.Title] CONTAINS {}", quote(search))
    };
    format!(
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project \
         AND [System.AssignedTo] = @Me AND [System.State] NOT IN {}{} \
         ORDER BY [System.ChangedDate] DESC",
        CLOSED_STATES, title
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents and parsing
// ─────────────────────────────────────────────────────────────────────────────

fn set_field(field: &str, value: &str) -> Value {
    json!({ "op": "add", "path": format!("/fields/{field}"), "value": value })
}

fn create_document(new_item: &NewWorkItem, relation_base: &str) -> Vec<Value> {
    let mut ops = vec![set_field("System.Title", new_item.title.trim())];
    if let Some(path) = new_item.iteration_path.as_deref().filter(|p| !p.is_empty()) {
        ops.push(set_field("System.IterationPath", path));
    }
    if let Some(path) = new_item.area_path.as_deref().filter(|p| !p.is_empty()) {
        ops.push(set_field("System.AreaPath", path));
    }
    if let Some(parent) = new_item.parent_id {
        ops.push(json!({
            "op": "add",
            "path": "/relations/-",
            "value": {
                "rel": PARENT_LINK,
                "url": format!("{relation_base}/{parent}"),
            }
        }));
    }
    ops
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(|s| s.parse().ok())
}

fn display_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => value["displayName"].as_str().map(str::to_string),
        _ => None,
    }
}

/// Parent id from `System.Parent`, falling back to the hierarchy relation.
fn parent_of(node: &Value) -> Option<WorkItemId> {
    node["fields"]["System.Parent"].as_i64().or_else(|| {
        node["relations"]
            .as_array()?
            .iter()
            .find(|r| r["rel"].as_str() == Some(PARENT_LINK))
            .and_then(|r| r["url"].as_str())
            .and_then(|url| url.rsplit('/').next())
            .and_then(|id| id.parse().ok())
    })
}

fn parse_work_item(node: &Value) -> WorkItem {
    let fields = &node["fields"];
    let text = |name: &str| fields[name].as_str().unwrap_or("").to_string();

    WorkItem {
        id: node["id"].as_i64().unwrap_or_default(),
        title: text("System.Title"),
        description: text("System.Description"),
        state: text("System.State"),
        work_item_type: text("System.WorkItemType"),
        assigned_to: display_name(&fields["System.AssignedTo"]),
        tags: fields["System.Tags"]
            .as_str()
            .map(|tags| {
                tags.split(';')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        priority: fields["Microsoft.VSTS.Common.Priority"].as_i64(),
        created_date: parse_date(&fields["System.CreatedDate"]),
        changed_date: parse_date(&fields["System.ChangedDate"]),
        iteration_path: text("System.IterationPath"),
        area_path: text("System.AreaPath"),
        parent_id: parent_of(node),
        comments: Vec::new(),
    }
}

fn parse_type_states(body: &Value) -> TypeStates {
    let mut states = TypeStates::default();
    for state in body["value"].as_array().into_iter().flatten() {
        let Some(name) = state["name"].as_str() else {
            continue;
        };
        let category = state["category"]
            .as_str()
            .map(StateCategory::from_api)
            .unwrap_or_else(|| StateCategory::guess(name));
        states.states.push(name.to_string());
        states.categories.insert(name.to_string(), category);
    }
    states
}

fn parse_sprint(node: &Value) -> Sprint {
    Sprint {
        name: node["name"].as_str().unwrap_or("").to_string(),
        path: node["path"].as_str().unwrap_or("").to_string(),
        start_date: parse_date(&node["attributes"]["startDate"]),
        end_date: parse_date(&node["attributes"]["finishDate"]),
    }
}

/// Locate the current iteration (by `timeFrame`, else by date) and its neighbours.
fn pick_sprints(body: &Value, now: DateTime<Utc>) -> SprintSlots {
    let nodes: Vec<&Value> = body["value"].as_array().into_iter().flatten().collect();
    let sprints: Vec<Sprint> = nodes.iter().map(|n| parse_sprint(n)).collect();

    let current = nodes
        .iter()
        .position(|n| n["attributes"]["timeFrame"].as_str() == Some("current"))
        .or_else(|| {
            sprints.iter().position(|s| match (s.start_date, s.end_date) {
                (Some(start), Some(end)) => start <= now && now <= end,
                _ => false,
            })
        });

    let Some(current) = current else {
        return SprintSlots::default();
    };

    SprintSlots {
        previous: current
            .checked_sub(1)
            .and_then(|i| sprints.get(i))
            .cloned(),
        current: sprints.get(current).cloned(),
        next: sprints.get(current + 1).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wiql_quotes_and_exclusions() {
        let q = sprint_query("Proj\\Sprint 'A'", &[3, 4]);
        assert!(q.contains("[System.IterationPath] = 'Proj\\Sprint ''A'''"));
        assert!(q.contains("[System.Id] NOT IN (3, 4)"));

        let q = sprint_query("", &[]);
        assert!(!q.contains("IterationPath"));
        assert!(!q.contains("NOT IN"));
    }

    #[test]
    fn test_backlog_queries() {
        let recent = recent_backlog_query("Proj", &[]);
        assert!(recent.contains("[System.IterationPath] = 'Proj'"));
        assert!(recent.contains("@Today - 30"));

        let abandoned = abandoned_query("Proj\\S2", &[9]);
        assert!(abandoned.contains("@Today - 14"));
        assert!(abandoned.contains("<> 'Proj\\S2'"));
        assert!(abandoned.contains("NOT IN (9)"));

        let mine = assigned_to_me_query(" login ");
        assert!(mine.contains("@Me"));
        assert!(mine.contains("CONTAINS 'login'"));
    }

    #[test]
    fn test_parse_work_item() {
        let node = json!({
            "id": 42,
            "fields": {
                "System.Title": "Fix login",
                "System.State": "Active",
                "System.WorkItemType": "Bug",
                "System.AssignedTo": { "displayName": "Ada Lovelace" },
                "System.Tags": "ui; auth",
                "Microsoft.VSTS.Common.Priority": 2,
                "System.ChangedDate": "2024-05-01T10:00:00Z",
                "System.IterationPath": "Proj\\S1",
                "System.Parent": 7
            }
        });
        let item = parse_work_item(&node);
        assert_eq!(item.id, 42);
        assert_eq!(item.assigned_to.as_deref(), Some("Ada Lovelace"));
        assert_eq!(item.tags, vec!["ui".to_string(), "auth".to_string()]);
        assert_eq!(item.priority, Some(2));
        assert_eq!(item.parent_id, Some(7));
        assert!(item.changed_date.is_some());
    }

    #[test]
    fn test_parent_from_relations() {
        let node = json!({
            "id": 5,
            "fields": {},
            "relations": [
                { "rel": "System.LinkTypes.Related", "url": "https://x/_apis/wit/workItems/1" },
                { "rel": PARENT_LINK, "url": "https://x/_apis/wit/workItems/3" }
            ]
        });
        assert_eq!(parse_work_item(&node).parent_id, Some(3));
    }

    #[test]
    fn test_parse_type_states() {
        let body = json!({ "value": [
            { "name": "New", "category": "Proposed" },
            { "name": "Resolved", "category": "Resolved" },
            { "name": "Closed", "category": "Completed" }
        ]});
        let states = parse_type_states(&body);
        assert_eq!(states.states, vec!["New", "Resolved", "Closed"]);
        assert_eq!(states.categories["Resolved"], StateCategory::InProgress);
        assert_eq!(states.categories["Closed"], StateCategory::Completed);
    }

    #[test]
    fn test_pick_sprints_by_time_frame() {
        let body = json!({ "value": [
            { "name": "S1", "path": "P\\S1", "attributes": { "timeFrame": "past" } },
            { "name": "S2", "path": "P\\S2", "attributes": { "timeFrame": "current" } },
            { "name": "S3", "path": "P\\S3", "attributes": { "timeFrame": "future" } }
        ]});
        let slots = pick_sprints(&body, Utc::now());
        assert_eq!(slots.path(crate::data::SprintTab::Previous), Some("P\\S1"));
        assert_eq!(slots.path(crate::data::SprintTab::Current), Some("P\\S2"));
        assert_eq!(slots.path(crate::data::SprintTab::Next), Some("P\\S3"));
    }

    #[test]
    fn test_pick_sprints_first_is_current() {
        let body = json!({ "value": [
            { "name": "S1", "path": "P\\S1", "attributes": { "timeFrame": "current" } }
        ]});
        let slots = pick_sprints(&body, Utc::now());
        assert!(slots.previous.is_none());
        assert!(slots.next.is_none());
        assert_eq!(slots.current.map(|s| s.name), Some("S1".to_string()));
    }

    #[test]
    fn test_create_document_links_parent() {
        let new_item = NewWorkItem {
            title: "  Child  ".to_string(),
            work_item_type: "Task".to_string(),
            iteration_path: Some("P\\S1".to_string()),
            parent_id: Some(12),
            area_path: None,
        };
        let ops = create_document(&new_item, "https://dev.azure.com/org/_apis/wit/workItems");
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0]["value"], "Child");
        assert_eq!(ops[2]["value"]["rel"], PARENT_LINK);
        assert_eq!(
            ops[2]["value"]["url"],
            "https://dev.azure.com/org/_apis/wit/workItems/12"
        );
    }

    #[test]
    fn test_web_url() {
        let client = AzureDevOps::new("https://dev.azure.com/org/", "My Proj", "Team", "t".into());
        assert_eq!(
            client.web_url(5).as_deref(),
            Some("https://dev.azure.com/org/My%20Proj/_workitems/edit/5")
        );
    }
}
