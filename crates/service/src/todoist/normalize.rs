//! Upstream response shapes.
//!
//! Todoist list endpoints answer either with a bare array (REST v2) or with a
//! `{ results, next_cursor }` page (API v1). Both collapse to the same local types here.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use super::domain::{Project, Task};
use super::error::TodoistError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Flat(Vec<T>),
    Paged {
        results: Vec<T>,
        #[serde(default)]
        next_cursor: Option<String>,
    },
}

impl<T> Listing<T> {
    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            Listing::Flat(items) => (items, None),
            Listing::Paged { results, next_cursor } => (results, next_cursor.filter(|c| !c.is_empty())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    RawId::deserialize(d).map(RawId::into_string)
}

fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(d)?.map(RawId::into_string))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UpstreamDue {
    Object { date: String },
    Bare(String),
}

#[derive(Deserialize)]
pub struct UpstreamTask {
    #[serde(deserialize_with = "id")]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    is_completed: Option<bool>,
    #[serde(default)]
    checked: Option<bool>,
    #[serde(default, deserialize_with = "opt_id")]
    project_id: Option<String>,
    #[serde(default)]
    due: Option<UpstreamDue>,
}

impl From<UpstreamTask> for Task {
    fn from(t: UpstreamTask) -> Self {
        Task {
            id: t.id,
            text: t.content,
            completed: t.is_completed.or(t.checked).unwrap_or(false),
            project_id: t.project_id,
            due: t.due.map(|d| match d {
                UpstreamDue::Object { date } => date,
                UpstreamDue::Bare(s) => s,
            }),
        }
    }
}

#[derive(Deserialize)]
pub struct UpstreamProject {
    #[serde(deserialize_with = "id")]
    id: String,
    #[serde(default)]
    name: String,
}

impl From<UpstreamProject> for Project {
    fn from(p: UpstreamProject) -> Self {
        Project { id: p.id, name: p.name }
    }
}

/// Decode one list response into local items plus the cursor of the next page, if any.
pub fn page<U, T>(value: Value) -> Result<(Vec<T>, Option<String>), TodoistError>
where
    U: DeserializeOwned + Into<T>,
{
    let listing: Listing<U> = serde_json::from_value(value).map_err(|e| TodoistError::Parse(e.to_string()))?;
    let (items, cursor) = listing.into_parts();
    Ok((items.into_iter().map(Into::into).collect(), cursor))
}

pub fn tasks_from_value(value: Value) -> Result<(Vec<Task>, Option<String>), TodoistError> {
    page::<UpstreamTask, Task>(value)
}

pub fn projects_from_value(value: Value) -> Result<(Vec<Project>, Option<String>), TodoistError> {
    page::<UpstreamProject, Project>(value)
}

pub fn task_from_value(value: Value) -> Result<Task, TodoistError> {
    serde_json::from_value::<UpstreamTask>(value)
        .map(Task::from)
        .map_err(|e| TodoistError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_and_paged_listings_normalize_identically() {
        let items = json!([
            {"id": "7025", "content": "Write report", "is_completed": false, "project_id": "220474322",
             "due": {"date": "2026-10-20", "string": "Oct 20"}},
            {"id": 7026, "content": "Call Sam", "checked": true, "project_id": 220474322, "due": null}
        ]);
        let (flat, flat_cursor) = tasks_from_value(items.clone()).unwrap();
        let (paged, paged_cursor) = tasks_from_value(json!({"results": items, "next_cursor": null})).unwrap();

        assert_eq!(flat, paged);
        assert_eq!(flat_cursor, None);
        assert_eq!(paged_cursor, None);
        assert_eq!(
            flat[1],
            Task {
                id: "7026".into(),
                text: "Call Sam".into(),
                completed: true,
                project_id: Some("220474322".into()),
                due: None,
            }
        );
        assert_eq!(flat[0].due.as_deref(), Some("2026-10-20"));
    }

    #[test]
    fn paged_listing_exposes_cursor() {
        let (tasks, cursor) =
            tasks_from_value(json!({"results": [{"id": "1", "content": "x", "due": "friday"}], "next_cursor": "abc"}))
                .unwrap();
        assert_eq!(cursor.as_deref(), Some("abc"));
        assert_eq!(tasks[0].due.as_deref(), Some("friday"));
        assert!(!tasks[0].completed);

        let (_, empty) = tasks_from_value(json!({"results": [], "next_cursor": ""})).unwrap();
        assert_eq!(empty, None);
    }

    #[test]
    fn projects_and_bad_shapes() {
        let (projects, _) = projects_from_value(json!([{"id": 12, "name": "Inbox", "color": "grey"}])).unwrap();
        assert_eq!(projects, vec![Project { id: "12".into(), name: "Inbox".into() }]);

        assert!(matches!(tasks_from_value(json!({"error": "nope"})), Err(TodoistError::Parse(_))));
        assert!(matches!(task_from_value(json!({"content": "no id"})), Err(TodoistError::Parse(_))));
    }
}
