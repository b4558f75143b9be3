//! In-process implementation of the remote tables.
//!
//! Mirrors the observable behavior of the hosted tables (server-assigned ids,
//! `42P01` while `lists` is not provisioned) and adds hooks to hold or fail
//! writes, which the store tests use to exercise in-flight and rollback paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use super::{ListBackend, TodoBackend, LISTS_TABLE};
use crate::error::{RemoteError, Result};
use crate::models::{ListId, NewTask, Task, TaskId, TaskPatch};

#[derive(Debug, Default)]
struct Tables {
    /// `None` while the `lists` relation does not exist
    lists: Option<BTreeMap<ListId, String>>,
    todos: Vec<Task>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Mutex<Tables>,
    write_gate: Arc<RwLock<()>>,
    fail_next_writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

/// Shared in-memory tables. Clones share the same data.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Both tables provisioned and empty
    pub fn new() -> Self {
        let backend = Self {
            inner: Arc::new(Inner::default()),
        };
        backend.tables().lists = Some(BTreeMap::new());
        backend
    }

    /// `todos` exists but `lists` has not been provisioned yet
    pub fn without_lists_table() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    /// Insert a row directly, bypassing gates and failure injection
    pub fn seed_task(&self, task: &NewTask) -> Task {
        let stored = stored_task(task);
        self.tables().todos.push(stored.clone());
        stored
    }

    /// Insert or replace a list row directly
    pub fn seed_list(&self, id: &ListId, title: &str) {
        if let Some(lists) = self.tables().lists.as_mut() {
            lists.insert(id.clone(), title.to_string());
        }
    }

    /// Current rows of one list ordered by `order`
    pub fn tasks(&self, list_id: &ListId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tables()
            .todos
            .iter()
            .filter(|task| &task.list_id == list_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.order);
        tasks
    }

    pub fn list_title(&self, id: &ListId) -> Option<String> {
        self.tables()
            .lists
            .as_ref()
            .and_then(|lists| lists.get(id).cloned())
    }

    pub fn has_lists_table(&self) -> bool {
        self.tables().lists.is_some()
    }

    /// Hold every write until the returned guard is dropped
    pub async fn pause_writes(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.inner.write_gate).write_owned().await
    }

    /// Fail the next `count` writes
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.fail_next_writes.store(count, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Names of the backend operations invoked so far, in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: &'static str) {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check_read(&self, call: &'static str) -> Result<()> {
        self.record(call);
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::new(None, format!("{call}: injected read failure")).into());
        }
        Ok(())
    }

    async fn begin_write(&self, call: &'static str) -> Result<()> {
        self.record(call);
        drop(self.inner.write_gate.read().await);

        let scheduled = self
            .inner
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if scheduled || self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::new(None, format!("{call}: injected write failure")).into());
        }
        Ok(())
    }

    fn lists_missing() -> crate::Error {
        RemoteError::relation_missing(LISTS_TABLE).into()
    }
}

fn stored_task(task: &NewTask) -> Task {
    Task {
        id: TaskId::from(Uuid::new_v4()),
        list_id: task.list_id.clone(),
        title: task.title.clone(),
        status: task.status,
        difficulty: task.difficulty,
        description: task.description.clone(),
        assignee: task.assignee.clone(),
        order: task.order,
        created_at: Utc::now(),
    }
}

impl TodoBackend for MemoryBackend {
    async fn fetch_tasks(&self, list_id: &ListId) -> Result<Vec<Task>> {
        self.check_read("fetch_tasks")?;
        Ok(self.tasks(list_id))
    }

    async fn fetch_task(&self, list_id: &ListId, task_id: &TaskId) -> Result<Option<Task>> {
        self.check_read("fetch_task")?;
        Ok(self
            .tables()
            .todos
            .iter()
            .find(|task| &task.id == task_id && &task.list_id == list_id)
            .cloned())
    }

    async fn count_tasks(&self, list_id: Option<&ListId>) -> Result<usize> {
        self.check_read("count_tasks")?;
        Ok(self
            .tables()
            .todos
            .iter()
            .filter(|task| list_id.map_or(true, |id| &task.list_id == id))
            .count())
    }

    async fn insert_task(&self, task: &NewTask) -> Result<Task> {
        self.begin_write("insert_task").await?;
        Ok(self.seed_task(task))
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<()> {
        self.begin_write("update_task").await?;
        let mut tables = self.tables();
        if let Some(task) = tables.todos.iter_mut().find(|task| &task.id == id) {
            patch.apply_to(task);
        }
        Ok(())
    }

    async fn upsert_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.begin_write("upsert_tasks").await?;
        let mut tables = self.tables();
        for incoming in tasks {
            match tables.todos.iter_mut().find(|task| task.id == incoming.id) {
                Some(existing) => *existing = incoming.clone(),
                None => tables.todos.push(incoming.clone()),
            }
        }
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.begin_write("delete_task").await?;
        self.tables().todos.retain(|task| &task.id != id);
        Ok(())
    }

    async fn delete_completed(&self, list_id: &ListId) -> Result<()> {
        self.begin_write("delete_completed").await?;
        self.tables()
            .todos
            .retain(|task| &task.list_id != list_id || !task.is_completed());
        Ok(())
    }
}

impl ListBackend for MemoryBackend {
    async fn fetch_list_title(&self, id: &ListId) -> Result<Option<String>> {
        self.check_read("fetch_list_title")?;
        let tables = self.tables();
        let lists = tables.lists.as_ref().ok_or_else(Self::lists_missing)?;
        Ok(lists.get(id).cloned())
    }

    async fn insert_list(&self, id: &ListId, title: &str) -> Result<()> {
        self.begin_write("insert_list").await?;
        let mut tables = self.tables();
        let lists = tables.lists.as_mut().ok_or_else(Self::lists_missing)?;
        if lists.contains_key(id) {
            return Err(RemoteError::new(
                Some("23505"),
                "duplicate key value violates unique constraint \"lists_pkey\"",
            )
            .into());
        }
        lists.insert(id.clone(), title.to_string());
        Ok(())
    }

    async fn update_list_title(&self, id: &ListId, title: &str) -> Result<()> {
        self.begin_write("update_list_title").await?;
        let mut tables = self.tables();
        let lists = tables.lists.as_mut().ok_or_else(Self::lists_missing)?;
        if let Some(existing) = lists.get_mut(id) {
            *existing = title.to_string();
        }
        Ok(())
    }

    async fn probe_lists(&self) -> Result<()> {
        self.check_read("probe_lists")?;
        if self.has_lists_table() {
            Ok(())
        } else {
            Err(Self::lists_missing())
        }
    }

    async fn execute_sql(&self, sql: &str) -> Result<()> {
        self.begin_write("execute_sql").await?;
        if sql.contains("CREATE TABLE IF NOT EXISTS lists") {
            let mut tables = self.tables();
            if tables.lists.is_none() {
                tables.lists = Some(BTreeMap::new());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_server_id() {
        let backend = MemoryBackend::new();
        let stored = backend
            .insert_task(&NewTask::new("list".into(), "Buy milk"))
            .await
            .unwrap();
        assert!(!stored.id.is_temporary());
        assert_eq!(backend.tasks(&"list".into()).len(), 1);
    }

    #[tokio::test]
    async fn missing_lists_table_reports_relation_error() {
        let backend = MemoryBackend::without_lists_table();
        let error = backend.fetch_list_title(&"list".into()).await.unwrap_err();
        assert!(error.is_relation_missing());

        backend
            .execute_sql(super::super::PROVISION_LISTS_SQL)
            .await
            .unwrap();
        assert!(backend.probe_lists().await.is_ok());
    }

    #[tokio::test]
    async fn scheduled_failures_are_consumed_in_order() {
        let backend = MemoryBackend::new();
        backend.fail_next_writes(1);
        let list: ListId = "list".into();
        assert!(backend.delete_completed(&list).await.is_err());
        assert!(backend.delete_completed(&list).await.is_ok());
        assert_eq!(backend.calls(), vec!["delete_completed", "delete_completed"]);
    }
}
