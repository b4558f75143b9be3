//! Task collection of the active list with optimistic remote writes.
//!
//! Every mutation applies locally first, then writes remotely. A failed write
//! is rolled back only while its operation token is still the latest; a newer
//! local mutation supersedes it and the failure is dropped.

use tokio::sync::watch;

use super::token::{BusyFlag, OperationTokens};
use super::MutationOutcome;
use crate::error::Result;
use crate::models::{
    clamp_difficulty, ordered_tasks, ListId, NewTask, Task, TaskId, TaskPatch, TaskStatus,
};
use crate::remote::TodoBackend;
use crate::util::normalize_text_option;

const ADD_FAILED: &str = "Failed to add todo";
const DELETE_FAILED: &str = "Failed to delete todo";
const UPDATE_FAILED: &str = "Failed to update todo";
const RENAME_FAILED: &str = "Failed to update todo title";
const MOVE_FAILED: &str = "Failed to move todo";
const CLEAR_FAILED: &str = "Failed to clear completed todos";
const LOAD_FAILED: &str = "Failed to load todos";

/// Snapshot published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodosState {
    pub items: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub editing_id: Option<TaskId>,
}

impl Default for TodosState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            error: None,
            editing_id: None,
        }
    }
}

/// Direction of a single-step reorder within the active tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// How to undo an optimistic change
#[derive(Debug)]
enum Revert {
    /// Drop an optimistic insert
    Remove(TaskId),
    /// Put back the previous versions of these tasks
    Restore(Vec<Task>),
}

#[derive(Debug)]
pub struct TodosStore<B> {
    backend: B,
    state: watch::Sender<TodosState>,
    tokens: OperationTokens,
    moving: BusyFlag,
    toggling: BusyFlag,
}

impl<B: TodoBackend> TodosStore<B> {
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(TodosState::default());
        Self {
            backend,
            state,
            tokens: OperationTokens::new(),
            moving: BusyFlag::new(),
            toggling: BusyFlag::new(),
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> TodosState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TodosState> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<Task> {
        self.state.borrow().items.clone()
    }

    /// Items in display sequence: active by order, then completed by order
    pub fn ordered(&self) -> Vec<Task> {
        ordered_tasks(&self.state.borrow().items)
    }

    pub fn find(&self, id: &TaskId) -> Option<Task> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|task| &task.id == id)
            .cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|state| state.error = error);
    }

    pub fn set_editing_id(&self, editing_id: Option<TaskId>) {
        self.state.send_modify(|state| state.editing_id = editing_id);
    }

    /// Replace the collection with the list's remote rows
    pub async fn load(&self, list_id: &ListId) -> Result<()> {
        self.set_loading(true);
        let result = self.backend.fetch_tasks(list_id).await;
        self.state.send_modify(|state| {
            state.loading = false;
            match &result {
                Ok(items) => {
                    state.items.clone_from(items);
                    state.error = None;
                }
                Err(_) => state.error = Some(LOAD_FAILED.to_string()),
            }
        });
        if let Err(error) = &result {
            tracing::error!(list_id = %list_id, %error, "{LOAD_FAILED}");
        }
        result.map(|_| ())
    }

    pub async fn add(&self, list_id: &ListId, title: &str) -> MutationOutcome {
        let title = title.trim();
        if title.is_empty() {
            return MutationOutcome::Ignored;
        }

        let mut new_task = NewTask::new(list_id.clone(), title);
        new_task.order = self.count_where(|task| !task.is_completed());
        let placeholder = Task::placeholder(&new_task);
        let temp_id = placeholder.id.clone();

        self.state
            .send_modify(|state| state.items.push(placeholder));
        let token = self.tokens.next_token();

        match self.backend.insert_task(&new_task).await {
            Ok(stored) => {
                self.state.send_modify(|state| {
                    if let Some(task) = state.items.iter_mut().find(|task| task.id == temp_id) {
                        task.id = stored.id;
                    }
                });
                MutationOutcome::Committed
            }
            Err(error) => {
                self.settle(token, Err(error), Revert::Remove(temp_id), ADD_FAILED, None)
                    .await
            }
        }
    }

    pub async fn delete(&self, id: &TaskId) -> MutationOutcome {
        let Some(task) = self.find(id) else {
            return MutationOutcome::Ignored;
        };

        self.state
            .send_modify(|state| state.items.retain(|item| &item.id != id));
        let token = self.tokens.next_token();

        let result = self.backend.delete_task(id).await;
        let list_id = task.list_id.clone();
        self.settle(
            token,
            result,
            Revert::Restore(vec![task]),
            DELETE_FAILED,
            Some(&list_id),
        )
        .await
    }

    /// Flip completion. Ignored while another toggle is pending.
    pub async fn toggle(&self, id: &TaskId) -> MutationOutcome {
        let Some(_busy) = self.toggling.try_acquire() else {
            tracing::debug!(task_id = %id, "Toggle already in flight, ignoring");
            return MutationOutcome::Ignored;
        };
        let Some(task) = self.find(id) else {
            return MutationOutcome::Ignored;
        };

        let status = task.status.toggled();
        self.change_status(task, status).await
    }

    /// Set the three-state status directly
    pub async fn set_status(&self, id: &TaskId, status: TaskStatus) -> MutationOutcome {
        match self.find(id) {
            Some(task) if task.status != status => self.change_status(task, status).await,
            _ => MutationOutcome::Ignored,
        }
    }

    /// Rename a task. Blank or unchanged titles make no remote call.
    pub async fn rename(&self, id: &TaskId, title: &str) -> MutationOutcome {
        let title = title.trim();
        let Some(task) = self.find(id) else {
            return MutationOutcome::Ignored;
        };
        if title.is_empty() || title == task.title {
            return MutationOutcome::Ignored;
        }

        let patch = TaskPatch {
            title: Some(title.to_string()),
            ..TaskPatch::default()
        };
        self.state.send_modify(|state| state.editing_id = None);
        self.patch_task(task, patch, RENAME_FAILED, false).await
    }

    pub async fn reassign(&self, id: &TaskId, assignee: Option<String>) -> MutationOutcome {
        let assignee = normalize_text_option(assignee);
        match self.find(id) {
            Some(task) if task.assignee != assignee => {
                let patch = TaskPatch {
                    assignee: Some(assignee),
                    ..TaskPatch::default()
                };
                self.patch_task(task, patch, UPDATE_FAILED, false).await
            }
            _ => MutationOutcome::Ignored,
        }
    }

    /// Update description and difficulty (clamped to 0-10)
    pub async fn update_details(
        &self,
        id: &TaskId,
        description: Option<String>,
        difficulty: Option<u8>,
    ) -> MutationOutcome {
        let Some(task) = self.find(id) else {
            return MutationOutcome::Ignored;
        };
        let description = normalize_text_option(description);
        let difficulty = difficulty.map(clamp_difficulty);

        let patch = TaskPatch {
            description: (task.description != description).then_some(description),
            difficulty: (task.difficulty != difficulty).then_some(difficulty),
            ..TaskPatch::default()
        };
        if patch.is_empty() {
            return MutationOutcome::Ignored;
        }
        self.patch_task(task, patch, UPDATE_FAILED, false).await
    }

    /// Swap a task with its neighbour among the active tasks.
    ///
    /// Active tasks are renumbered `0..n` first; completed tasks keep their
    /// order. A move issued while another move is in flight is dropped.
    pub async fn move_task(&self, id: &TaskId, direction: MoveDirection) -> MutationOutcome {
        let Some(_busy) = self.moving.try_acquire() else {
            tracing::debug!(task_id = %id, "Move already in flight, ignoring");
            return MutationOutcome::Ignored;
        };

        let mut active: Vec<Task> = self
            .items()
            .into_iter()
            .filter(|task| !task.is_completed())
            .collect();
        active.sort_by_key(|task| task.order);

        let Some(current) = active.iter().position(|task| &task.id == id) else {
            return MutationOutcome::Ignored;
        };
        let target = match direction {
            MoveDirection::Up if current > 0 => current - 1,
            MoveDirection::Down if current + 1 < active.len() => current + 1,
            _ => return MutationOutcome::Ignored,
        };

        let previous = active.clone();
        active.swap(current, target);
        let mut changed = Vec::new();
        let mut originals = Vec::new();
        for (index, task) in active.iter_mut().enumerate() {
            let order = i64::try_from(index).unwrap_or(i64::MAX);
            if task.order != order {
                if let Some(original) = previous.iter().find(|item| item.id == task.id) {
                    originals.push(original.clone());
                }
                task.order = order;
                changed.push(task.clone());
            }
        }

        self.state.send_modify(|state| {
            for task in &mut state.items {
                if let Some(updated) = changed.iter().find(|item| item.id == task.id) {
                    task.order = updated.order;
                }
            }
        });
        let token = self.tokens.next_token();

        let result = self.backend.upsert_tasks(&changed).await;
        let list_id = previous[current].list_id.clone();
        self.settle(
            token,
            result,
            Revert::Restore(originals),
            MOVE_FAILED,
            Some(&list_id),
        )
        .await
    }

    /// Delete every completed task of the list
    pub async fn clear_completed(&self, list_id: &ListId) -> MutationOutcome {
        let completed: Vec<Task> = self
            .items()
            .into_iter()
            .filter(|task| &task.list_id == list_id && task.is_completed())
            .collect();
        if completed.is_empty() {
            return MutationOutcome::Ignored;
        }

        self.state.send_modify(|state| {
            state
                .items
                .retain(|task| &task.list_id != list_id || !task.is_completed());
        });
        let token = self.tokens.next_token();

        let result = self.backend.delete_completed(list_id).await;
        self.settle(
            token,
            result,
            Revert::Restore(completed),
            CLEAR_FAILED,
            Some(list_id),
        )
        .await
    }

    /// Status change that moves the task to the end of its new group
    async fn change_status(&self, task: Task, status: TaskStatus) -> MutationOutcome {
        let mut patch = TaskPatch {
            status: Some(status),
            ..TaskPatch::default()
        };
        if status.is_completed() != task.is_completed() {
            let order =
                self.count_where(|item| item.id != task.id && item.is_completed() == status.is_completed());
            patch.order = Some(order);
        }
        self.patch_task(task, patch, UPDATE_FAILED, true).await
    }

    async fn patch_task(
        &self,
        task: Task,
        patch: TaskPatch,
        failure: &str,
        reload_on_failure: bool,
    ) -> MutationOutcome {
        self.state.send_modify(|state| {
            if let Some(item) = state.items.iter_mut().find(|item| item.id == task.id) {
                patch.apply_to(item);
            }
        });
        let token = self.tokens.next_token();

        let result = self.backend.update_task(&task.id, &patch).await;
        let list_id = task.list_id.clone();
        self.settle(
            token,
            result,
            Revert::Restore(vec![task]),
            failure,
            reload_on_failure.then_some(&list_id),
        )
        .await
    }

    async fn settle(
        &self,
        token: u64,
        result: Result<()>,
        revert: Revert,
        failure: &str,
        reload: Option<&ListId>,
    ) -> MutationOutcome {
        let Err(error) = result else {
            return MutationOutcome::Committed;
        };

        if !self.tokens.is_latest(token) {
            tracing::debug!(token, %error, "Dropping failure of superseded mutation");
            // A placeholder has no server row to fall back on.
            if let Revert::Remove(id) = revert {
                self.state
                    .send_modify(|state| state.items.retain(|item| item.id != id));
            }
            return MutationOutcome::Superseded;
        }

        tracing::error!(%error, "{failure}");
        self.state.send_modify(|state| {
            match revert {
                Revert::Remove(id) => state.items.retain(|item| item.id != id),
                Revert::Restore(tasks) => restore(&mut state.items, tasks),
            }
            state.error = Some(failure.to_string());
        });

        if let Some(list_id) = reload {
            self.refresh(list_id, token).await;
        }
        MutationOutcome::RolledBack
    }

    /// Re-read the remote rows after a rollback. Skipped when a newer
    /// mutation started meanwhile, so its optimistic state is kept.
    async fn refresh(&self, list_id: &ListId, token: u64) {
        match self.backend.fetch_tasks(list_id).await {
            Ok(items) if self.tokens.is_latest(token) => {
                self.state.send_modify(|state| state.items = items);
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(list_id = %list_id, %error, "{LOAD_FAILED}");
            }
        }
    }

    fn count_where(&self, predicate: impl Fn(&Task) -> bool) -> i64 {
        let count = self
            .state
            .borrow()
            .items
            .iter()
            .filter(|task| predicate(task))
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

fn restore(items: &mut Vec<Task>, previous: Vec<Task>) {
    for task in previous {
        match items.iter_mut().find(|item| item.id == task.id) {
            Some(existing) => *existing = task,
            None => items.push(task),
        }
    }
}
