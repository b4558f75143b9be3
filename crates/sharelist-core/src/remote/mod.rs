//! Remote table access for the `lists` and `todos` tables.
//!
//! The stores only talk to the traits below, so they can run against the
//! hosted `PostgREST` API ([`SupabaseClient`]) or the in-process
//! [`MemoryBackend`].

mod memory;
mod supabase;

use std::future::Future;

use crate::error::Result;
use crate::models::{ListId, NewTask, Task, TaskId, TaskPatch};

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;

/// Name of the remote table holding list metadata.
pub const LISTS_TABLE: &str = "lists";

/// Name of the remote table holding tasks.
pub const TODOS_TABLE: &str = "todos";

/// SQL executed through the `execute_sql` RPC when auto-provisioning is enabled.
pub const PROVISION_LISTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS lists (
  id text PRIMARY KEY,
  title text NOT NULL DEFAULT 'Untitled List',
  created_at timestamptz DEFAULT now()
);

ALTER TABLE lists ENABLE ROW LEVEL SECURITY;

CREATE POLICY "Allow public access on lists"
  ON lists
  FOR ALL
  TO public
  USING (true)
  WITH CHECK (true);
"#;

/// Operations on the `todos` table
pub trait TodoBackend: Send + Sync {
    /// All tasks of a list ordered by `order`
    fn fetch_tasks(&self, list_id: &ListId) -> impl Future<Output = Result<Vec<Task>>> + Send;

    /// One task of a list, `None` when no such row exists
    fn fetch_task(
        &self,
        list_id: &ListId,
        task_id: &TaskId,
    ) -> impl Future<Output = Result<Option<Task>>> + Send;

    /// Row count, optionally restricted to one list. Doubles as a health check.
    fn count_tasks(&self, list_id: Option<&ListId>) -> impl Future<Output = Result<usize>> + Send;

    /// Insert a task and return the stored row with its server-assigned id
    fn insert_task(&self, task: &NewTask) -> impl Future<Output = Result<Task>> + Send;

    fn update_task(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Insert-or-update full rows by id
    fn upsert_tasks(&self, tasks: &[Task]) -> impl Future<Output = Result<()>> + Send;

    fn delete_task(&self, id: &TaskId) -> impl Future<Output = Result<()>> + Send;

    /// Delete every completed task of a list
    fn delete_completed(&self, list_id: &ListId) -> impl Future<Output = Result<()>> + Send;
}

/// Operations on the `lists` table
pub trait ListBackend: Send + Sync {
    /// Title of a list, `None` when the row does not exist yet
    fn fetch_list_title(
        &self,
        id: &ListId,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    fn insert_list(&self, id: &ListId, title: &str) -> impl Future<Output = Result<()>> + Send;

    fn update_list_title(
        &self,
        id: &ListId,
        title: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Cheap query that fails with `42P01` while the table is missing
    fn probe_lists(&self) -> impl Future<Output = Result<()>> + Send;

    /// Run raw SQL through the project's `execute_sql` RPC
    fn execute_sql(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;
}
