//! Recently visited lists, most recent first.

use tokio::sync::watch;

use crate::models::{ListEntry, ListId};
use crate::storage::{Persistent, SharedStorage};

pub const HISTORY_KEY: &str = "todo-list-history";

/// Entries kept after an insert
pub const MAX_HISTORY: usize = 30;

#[derive(Debug)]
pub struct HistoryStore {
    entries: Persistent<Vec<ListEntry>>,
}

impl HistoryStore {
    pub fn open(storage: SharedStorage) -> Self {
        Self {
            entries: Persistent::open(storage, HISTORY_KEY, Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<ListEntry> {
        self.entries.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ListEntry>> {
        self.entries.subscribe()
    }

    /// Record a visit: moves an existing entry to the front, caps the history
    pub fn add(&self, id: &ListId, title: &str) {
        self.entries.update(|entries| {
            entries.retain(|entry| &entry.id != id);
            entries.insert(0, ListEntry::new(id.clone(), title));
            entries.truncate(MAX_HISTORY);
        });
    }

    pub fn remove(&self, id: &ListId) {
        self.entries
            .update(|entries| entries.retain(|entry| &entry.id != id));
    }

    pub fn clear(&self) {
        self.entries.set(Vec::new());
    }

    pub fn update_title(&self, id: &ListId, title: &str) {
        self.entries.update(|entries| {
            for entry in entries.iter_mut().filter(|entry| &entry.id == id) {
                entry.title = title.to_string();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStorage;

    fn ids(store: &HistoryStore) -> Vec<String> {
        store
            .entries()
            .into_iter()
            .map(|entry| entry.id.to_string())
            .collect()
    }

    #[test]
    fn revisiting_moves_entry_to_front() {
        let store = HistoryStore::open(MemoryStorage::shared());
        store.add(&"a".into(), "A");
        store.add(&"b".into(), "B");
        store.add(&"a".into(), "A renamed");

        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.entries()[0].title, "A renamed");
    }

    #[test]
    fn history_is_capped() {
        let store = HistoryStore::open(MemoryStorage::shared());
        for index in 0..=MAX_HISTORY {
            store.add(&ListId::from(format!("list-{index}")), "List");
        }

        let entries = store.entries();
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(entries[0].id.as_str(), format!("list-{MAX_HISTORY}"));
        assert!(!entries.iter().any(|entry| entry.id.as_str() == "list-0"));
    }

    #[test]
    fn history_survives_reopen() {
        let storage = MemoryStorage::shared();
        let store = HistoryStore::open(storage.clone());
        store.add(&"a".into(), "A");
        store.add(&"b".into(), "B");
        store.update_title(&"a".into(), "Renamed");
        store.remove(&"b".into());

        let reopened = HistoryStore::open(storage);
        assert_eq!(reopened.entries(), vec![ListEntry::new("a", "Renamed")]);

        reopened.clear();
        assert!(reopened.entries().is_empty());
    }
}
