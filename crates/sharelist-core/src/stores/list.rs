//! Metadata of the active list.

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::models::{ListId, DEFAULT_LIST_TITLE};
use crate::remote::{ListBackend, TodoBackend, PROVISION_LISTS_SQL};

const DATABASE_FAILED: &str = "Database connection failed";
const ENSURE_TABLE_FAILED: &str = "Failed to ensure lists table exists";
const LOAD_TITLE_FAILED: &str = "Failed to load list title";
const UPDATE_TITLE_FAILED: &str = "Failed to update list title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    pub id: ListId,
    pub title: String,
    pub loading: bool,
    pub error: Option<String>,
    pub is_editing: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            id: ListId::default(),
            title: String::new(),
            loading: true,
            error: None,
            is_editing: false,
        }
    }
}

/// Title store for one list. Title writes are last-write-wins.
#[derive(Debug)]
pub struct ListStore<B> {
    backend: B,
    state: watch::Sender<ListState>,
    auto_provision: bool,
}

impl<B: ListBackend + TodoBackend> ListStore<B> {
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            backend,
            state,
            auto_provision: false,
        }
    }

    /// Create the `lists` table when it is missing during [`Self::initialize`]
    #[must_use]
    pub const fn with_auto_provision(mut self, enabled: bool) -> Self {
        self.auto_provision = enabled;
        self
    }

    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    pub fn id(&self) -> ListId {
        self.state.borrow().id.clone()
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|state| state.error = error);
    }

    pub fn set_editing(&self, is_editing: bool) {
        self.state.send_modify(|state| state.is_editing = is_editing);
    }

    /// Bind the store to a list: health check, table check, then title load
    pub async fn initialize(&self, list_id: &ListId) {
        self.state.send_modify(|state| {
            state.id = list_id.clone();
            state.loading = true;
        });

        let result = self.prepare(list_id).await;
        self.state.send_modify(|state| {
            state.loading = false;
            if let Err(message) = &result {
                state.error = Some(message.clone());
            }
        });
    }

    async fn prepare(&self, list_id: &ListId) -> std::result::Result<(), String> {
        if let Err(error) = self.backend.count_tasks(None).await {
            tracing::error!(%error, "Todos health check failed");
            return Err(DATABASE_FAILED.to_string());
        }
        if let Err(error) = self.ensure_lists_table().await {
            tracing::error!(%error, "{ENSURE_TABLE_FAILED}");
            return Err(ENSURE_TABLE_FAILED.to_string());
        }
        self.load(list_id).await;
        Ok(())
    }

    /// Probe `lists`; provisioning runs only when enabled and the table is missing
    async fn ensure_lists_table(&self) -> Result<()> {
        match self.backend.probe_lists().await {
            Ok(()) => Ok(()),
            Err(error) if error.is_relation_missing() && self.auto_provision => {
                tracing::info!("Provisioning missing lists table");
                self.backend.execute_sql(PROVISION_LISTS_SQL).await
            }
            // Title loads already default on 42P01.
            Err(error) if error.is_relation_missing() => {
                tracing::warn!("lists table is missing and auto-provisioning is disabled");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Load the title. A missing row or missing table yields the default title.
    pub async fn load(&self, list_id: &ListId) {
        let title = match self.backend.fetch_list_title(list_id).await {
            Ok(title) => title,
            Err(error) if error.is_relation_missing() => None,
            Err(error) => {
                tracing::error!(list_id = %list_id, %error, "{LOAD_TITLE_FAILED}");
                self.set_error(Some(LOAD_TITLE_FAILED.to_string()));
                None
            }
        };
        let title = title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LIST_TITLE.to_string());
        self.state.send_modify(|state| state.title = title);
    }

    /// Rename the list.
    ///
    /// A blank title resets locally to the default; an unchanged title makes
    /// no remote call. Failures only set the error flag.
    pub async fn update_title(&self, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            self.state
                .send_modify(|state| state.title = DEFAULT_LIST_TITLE.to_string());
            return Ok(());
        }

        let (list_id, current) = {
            let state = self.state.borrow();
            (state.id.clone(), state.title.clone())
        };
        if title == current {
            return Ok(());
        }
        if list_id.is_empty() {
            return Err(Error::InvalidInput(
                "List store is not bound to a list".to_string(),
            ));
        }

        self.state.send_modify(|state| state.title = title.to_string());

        let result = self.write_title(&list_id, title).await;
        if let Err(error) = &result {
            tracing::error!(list_id = %list_id, %error, "{UPDATE_TITLE_FAILED}");
            self.set_error(Some(UPDATE_TITLE_FAILED.to_string()));
        }
        result
    }

    /// Insert the row on first rename, update it afterwards
    async fn write_title(&self, list_id: &ListId, title: &str) -> Result<()> {
        match self.backend.fetch_list_title(list_id).await {
            Ok(Some(_)) => self.backend.update_list_title(list_id, title).await,
            Ok(None) => self.backend.insert_list(list_id, title).await,
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::MemoryBackend;

    fn list() -> ListId {
        "weekend".into()
    }

    async fn initialized(backend: &MemoryBackend) -> ListStore<MemoryBackend> {
        let store = ListStore::new(backend.clone());
        store.initialize(&list()).await;
        store
    }

    #[tokio::test]
    async fn initialize_loads_stored_title() {
        let backend = MemoryBackend::new();
        backend.seed_list(&list(), "Weekend chores");

        let store = initialized(&backend).await;
        let state = store.state();
        assert_eq!(state.id, list());
        assert_eq!(state.title, "Weekend chores");
        assert_eq!(state.error, None);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn missing_lists_table_defaults_title_without_error() {
        let backend = MemoryBackend::without_lists_table();
        let store = initialized(&backend).await;

        assert_eq!(store.title(), DEFAULT_LIST_TITLE);
        assert_eq!(store.state().error, None);
        assert!(!backend.calls().contains(&"execute_sql"));
    }

    #[tokio::test]
    async fn auto_provision_creates_lists_table() {
        let backend = MemoryBackend::without_lists_table();
        let store = ListStore::new(backend.clone()).with_auto_provision(true);
        store.initialize(&list()).await;

        assert!(backend.has_lists_table());
        assert_eq!(store.title(), DEFAULT_LIST_TITLE);
        assert_eq!(store.state().error, None);
    }

    #[tokio::test]
    async fn failed_provisioning_sets_error() {
        let backend = MemoryBackend::without_lists_table();
        backend.fail_next_writes(1);
        let store = ListStore::new(backend.clone()).with_auto_provision(true);
        store.initialize(&list()).await;

        assert_eq!(store.state().error.as_deref(), Some(ENSURE_TABLE_FAILED));
    }

    #[tokio::test]
    async fn failed_health_check_sets_error() {
        let backend = MemoryBackend::new();
        backend.set_fail_reads(true);
        let store = initialized(&backend).await;

        assert_eq!(store.state().error.as_deref(), Some(DATABASE_FAILED));
    }

    #[tokio::test]
    async fn unchanged_title_makes_no_remote_call() {
        let backend = MemoryBackend::new();
        backend.seed_list(&list(), "Weekend chores");
        let store = initialized(&backend).await;
        let calls_before = backend.calls().len();

        store.update_title("  Weekend chores ").await.unwrap();
        assert_eq!(backend.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn blank_title_resets_locally() {
        let backend = MemoryBackend::new();
        backend.seed_list(&list(), "Weekend chores");
        let store = initialized(&backend).await;
        let calls_before = backend.calls().len();

        store.update_title("   ").await.unwrap();
        assert_eq!(store.title(), DEFAULT_LIST_TITLE);
        assert_eq!(backend.calls().len(), calls_before);
        assert_eq!(backend.list_title(&list()).as_deref(), Some("Weekend chores"));
    }

    #[tokio::test]
    async fn first_rename_inserts_then_updates() {
        let backend = MemoryBackend::new();
        let store = initialized(&backend).await;

        store.update_title("Party").await.unwrap();
        assert_eq!(backend.list_title(&list()).as_deref(), Some("Party"));

        store.update_title("Party prep").await.unwrap();
        assert_eq!(backend.list_title(&list()).as_deref(), Some("Party prep"));
        assert!(backend.calls().contains(&"insert_list"));
        assert!(backend.calls().contains(&"update_list_title"));
    }

    #[tokio::test]
    async fn failed_rename_keeps_title_and_sets_error() {
        let backend = MemoryBackend::new();
        let store = initialized(&backend).await;
        backend.fail_next_writes(1);

        assert!(store.update_title("Party").await.is_err());
        assert_eq!(store.title(), "Party");
        assert_eq!(store.state().error.as_deref(), Some(UPDATE_TITLE_FAILED));
    }
}
