//! Task model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ListId;

/// Prefix marking locally generated ids that have not been confirmed remotely.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Highest difficulty score (five stars in half-star steps).
pub const MAX_DIFFICULTY: u8 = 10;

/// Identifier of a task row.
///
/// Confirmed ids are assigned by the remote table (UUIDs); optimistic inserts
/// carry a temporary placeholder until the insert resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a placeholder id for an optimistic insert
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", Uuid::now_v7().simple()))
    }

    /// Whether this id is a local placeholder
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Uuid> for TaskId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

/// Progress of a task. Only `Done` counts as completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Status after a completion toggle: done flips back to not started,
    /// anything else becomes done.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Done => Self::NotStarted,
            Self::NotStarted | Self::InProgress => Self::Done,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts the canonical names plus the legacy boolean `completed` column.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "not_started" | "todo" | "open" | "false" | "" => Ok(Self::NotStarted),
            "in_progress" | "doing" | "started" => Ok(Self::InProgress),
            "done" | "completed" | "complete" | "true" => Ok(Self::Done),
            _ => Err(format!("unknown task status: {s}")),
        }
    }
}

/// A task row as held by the stores and the remote `todos` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub list_id: ListId,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// 0-10, i.e. 0-5 stars with half-star increments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build the optimistic local copy of a task about to be inserted
    #[must_use]
    pub fn placeholder(new_task: &NewTask) -> Self {
        Self {
            id: TaskId::temporary(),
            list_id: new_task.list_id.clone(),
            title: new_task.title.clone(),
            status: new_task.status,
            difficulty: new_task.difficulty,
            description: new_task.description.clone(),
            assignee: new_task.assignee.clone(),
            order: new_task.order,
            created_at: Utc::now(),
        }
    }

    pub const fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Insert payload for the `todos` table. The server assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub list_id: ListId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub order: i64,
}

impl NewTask {
    pub fn new(list_id: ListId, title: impl Into<String>) -> Self {
        Self {
            list_id,
            title: title.into(),
            status: TaskStatus::NotStarted,
            difficulty: None,
            description: None,
            assignee: None,
            order: 0,
        }
    }
}

/// Partial update for one task row. `None` fields are left untouched;
/// `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Option<u8>>,
}

impl TaskPatch {
    /// Apply the patch to a local task copy
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(assignee) = &self.assignee {
            task.assignee.clone_from(assignee);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(difficulty) = self.difficulty {
            task.difficulty = difficulty;
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.order.is_none()
            && self.assignee.is_none()
            && self.description.is_none()
            && self.difficulty.is_none()
    }
}

/// Display sequence: not-completed tasks by order, then completed tasks by order
#[must_use]
pub fn ordered_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut ordered = tasks.to_vec();
    ordered.sort_by_key(|task| (task.is_completed(), task.order));
    ordered
}

/// Clamp a difficulty score into the supported 0-10 range
pub fn clamp_difficulty(value: u8) -> u8 {
    value.min(MAX_DIFFICULTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus, order: i64) -> Task {
        Task {
            id: id.into(),
            list_id: "list".into(),
            title: id.to_string(),
            status,
            difficulty: None,
            description: None,
            assignee: None,
            order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn temporary_ids_are_unique_and_marked() {
        let first = TaskId::temporary();
        let second = TaskId::temporary();
        assert_ne!(first, second);
        assert!(first.is_temporary());
        assert!(!TaskId::from(Uuid::new_v4()).is_temporary());
    }

    #[test]
    fn toggled_status_flips_completion() {
        assert_eq!(TaskStatus::NotStarted.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::InProgress.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.toggled(), TaskStatus::NotStarted);
    }

    #[test]
    fn status_parses_legacy_and_canonical_names() {
        assert_eq!("in progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("true".parse::<TaskStatus>(), Ok(TaskStatus::Done));
        assert_eq!("Not-Started".parse::<TaskStatus>(), Ok(TaskStatus::NotStarted));
        assert!("someday".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn task_deserializes_remote_row() {
        let row = r#"{
            "id": "5b0f8a52-6f57-4c8e-9d57-3b1b6c1d2e3f",
            "list_id": "groceries",
            "title": "Buy milk",
            "status": "in_progress",
            "difficulty": 4,
            "description": null,
            "order": 2,
            "created_at": "2024-05-01T12:34:56.123456+00:00"
        }"#;
        let task: Task = serde_json::from_str(row).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.difficulty, Some(4));
        assert_eq!(task.description, None);
        assert_eq!(task.order, 2);
    }

    #[test]
    fn patch_serializes_only_set_fields_and_null_clears() {
        let patch = TaskPatch {
            title: Some("Renamed".into()),
            assignee: Some(None),
            ..TaskPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Renamed", "assignee": null}));
    }

    #[test]
    fn ordered_tasks_puts_completed_last() {
        let tasks = vec![
            task("done-0", TaskStatus::Done, 0),
            task("open-1", TaskStatus::NotStarted, 1),
            task("open-0", TaskStatus::InProgress, 0),
        ];
        let ids: Vec<String> = ordered_tasks(&tasks)
            .into_iter()
            .map(|task| task.id.to_string())
            .collect();
        assert_eq!(ids, vec!["open-0", "open-1", "done-0"]);
    }
}
