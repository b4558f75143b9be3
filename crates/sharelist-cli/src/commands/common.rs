use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sharelist_core::config::STORAGE_DIR_VAR;
use sharelist_core::models::MAX_DIFFICULTY;
use sharelist_core::remote::{ListBackend, TodoBackend};
use sharelist_core::storage::{default_storage_dir, FileStorage, SharedStorage};
use sharelist_core::stores::{HistoryStore, ListStore, TodosStore};
use sharelist_core::{ListId, MutationOutcome, Task, TaskStatus};

use crate::error::CliError;

/// Stores bound to one list, loaded and recorded in history
pub struct Session<B> {
    pub list: ListStore<B>,
    pub todos: TodosStore<B>,
    pub history: HistoryStore,
    pub storage: SharedStorage,
}

impl<B: TodoBackend + ListBackend + Clone> Session<B> {
    pub async fn open(
        backend: B,
        auto_provision: bool,
        storage: SharedStorage,
        list_id: &ListId,
    ) -> Result<Self, CliError> {
        let list = ListStore::new(backend.clone()).with_auto_provision(auto_provision);
        list.initialize(list_id).await;
        if let Some(error) = list.state().error {
            tracing::warn!(list_id = %list_id, %error, "List initialization reported an error");
        }

        let todos = TodosStore::new(backend);
        todos.load(list_id).await?;

        let history = HistoryStore::open(Arc::clone(&storage));
        history.add(list_id, &list.title());

        Ok(Self {
            list,
            todos,
            history,
            storage,
        })
    }

    pub fn list_id(&self) -> ListId {
        self.list.id()
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub difficulty: Option<u8>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub order: i64,
    pub created_at: i64,
    pub relative_time: String,
}

/// Find a task by full id or by a unique id prefix
pub fn resolve_task(task_query: &str, tasks: &[Task]) -> Result<Task, CliError> {
    let query = normalize_task_identifier(task_query)?;

    if let Some(task) = tasks.iter().find(|task| task.id.as_str() == query) {
        return Ok(task.clone());
    }

    let matching: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.id.as_str().starts_with(&query))
        .collect();

    match matching.as_slice() {
        [] => Err(CliError::TaskNotFound(query)),
        [task] => Ok((*task).clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|task| short_id(task))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousTaskId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_task_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTaskId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_title(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Turn a store outcome into a CLI result, surfacing the store's error message
pub fn ensure_applied<B: TodoBackend>(outcome: MutationOutcome, todos: &TodosStore<B>) -> Result<bool, CliError> {
    match outcome {
        MutationOutcome::Committed => Ok(true),
        MutationOutcome::Ignored => Ok(false),
        MutationOutcome::RolledBack | MutationOutcome::Superseded => Err(CliError::MutationFailed(
            todos
                .error()
                .unwrap_or_else(|| "Change was not saved".to_string()),
        )),
    }
}

pub fn short_id(task: &Task) -> String {
    task.id.as_str().chars().take(13).collect()
}

pub fn format_task_lines(tasks: &[Task], wide: bool) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    let width = if wide { 80 } else { 40 };

    tasks
        .iter()
        .map(|task| {
            let marker = status_marker(task.status);
            let preview = task_preview(&task.title, width);
            let stars = difficulty_label(task.difficulty);
            let mut line = format!("{:<13}  {marker} {preview:<width$}  {stars:<5}", short_id(task));

            if let Some(assignee) = &task.assignee {
                line.push_str(&format!("  @{assignee}"));
            }
            if wide {
                let relative_time = format_relative_time(task.created_at.timestamp_millis(), now_ms);
                line.push_str(&format!("  {relative_time}"));
            }
            line.trim_end().to_string()
        })
        .collect()
}

pub fn task_to_list_item(task: &Task) -> TaskListItem {
    let now_ms = Utc::now().timestamp_millis();
    let created_at = task.created_at.timestamp_millis();

    TaskListItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        status: task.status,
        difficulty: task.difficulty,
        description: task.description.clone(),
        assignee: task.assignee.clone(),
        order: task.order,
        created_at,
        relative_time: format_relative_time(created_at, now_ms),
    }
}

pub const fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Done => "[x]",
    }
}

/// Difficulty as stars out of five, e.g. `3.5*`
pub fn difficulty_label(difficulty: Option<u8>) -> String {
    match difficulty {
        None | Some(0) => String::new(),
        Some(value) => {
            let value = value.min(MAX_DIFFICULTY);
            if value % 2 == 0 {
                format!("{}*", value / 2)
            } else {
                format!("{}.5*", value / 2)
            }
        }
    }
}

pub fn task_preview(title: &str, max_chars: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Pick the list to operate on: explicit flag first, then the most recent history entry
pub fn resolve_list_id(cli_list: Option<&str>, history: &HistoryStore) -> Result<ListId, CliError> {
    if let Some(list) = cli_list.map(str::trim).filter(|list| !list.is_empty()) {
        return Ok(ListId::from(list));
    }

    history
        .entries()
        .into_iter()
        .next()
        .map(|entry| entry.id)
        .ok_or(CliError::NoListSelected)
}

pub fn resolve_storage_dir(cli_storage_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = cli_storage_dir.or_else(|| env::var_os(STORAGE_DIR_VAR).map(PathBuf::from)) {
        return Ok(dir);
    }
    Ok(default_storage_dir()?)
}

pub fn open_storage(cli_storage_dir: Option<PathBuf>) -> Result<SharedStorage, CliError> {
    let storage = FileStorage::open(resolve_storage_dir(cli_storage_dir)?)?;
    tracing::debug!(path = %storage.root().display(), "Using local storage");
    Ok(Arc::new(storage))
}
