//! Pinned lists in insertion order.

use tokio::sync::watch;

use crate::models::{ListEntry, ListId};
use crate::storage::{Persistent, SharedStorage};

pub const FAVORITES_KEY: &str = "todo-list-favorites";

#[derive(Debug)]
pub struct FavoritesStore {
    entries: Persistent<Vec<ListEntry>>,
}

impl FavoritesStore {
    pub fn open(storage: SharedStorage) -> Self {
        Self {
            entries: Persistent::open(storage, FAVORITES_KEY, Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<ListEntry> {
        self.entries.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ListEntry>> {
        self.entries.subscribe()
    }

    pub fn is_favorite(&self, id: &ListId) -> bool {
        self.entries
            .with(|entries| entries.iter().any(|entry| &entry.id == id))
    }

    /// Pin a list; already pinned lists are left untouched
    pub fn add(&self, id: &ListId, title: &str) {
        if self.is_favorite(id) {
            return;
        }
        self.entries
            .update(|entries| entries.push(ListEntry::new(id.clone(), title)));
    }

    pub fn remove(&self, id: &ListId) {
        self.entries
            .update(|entries| entries.retain(|entry| &entry.id != id));
    }

    /// Pin or unpin; returns whether the list is pinned afterwards
    pub fn toggle(&self, id: &ListId, title: &str) -> bool {
        if self.is_favorite(id) {
            self.remove(id);
            false
        } else {
            self.add(id, title);
            true
        }
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

    #[test]
    fn adding_twice_keeps_one_entry() {
        let store = FavoritesStore::open(MemoryStorage::shared());
        store.add(&"a".into(), "A");
        store.add(&"a".into(), "A again");
        assert_eq!(store.entries(), vec![ListEntry::new("a", "A")]);
    }

    #[test]
    fn favorites_keep_insertion_order() {
        let store = FavoritesStore::open(MemoryStorage::shared());
        store.add(&"b".into(), "B");
        store.add(&"a".into(), "A");
        store.update_title(&"b".into(), "Bee");
        assert_eq!(
            store.entries(),
            vec![ListEntry::new("b", "Bee"), ListEntry::new("a", "A")]
        );
    }

    #[test]
    fn toggle_pins_and_unpins() {
        let storage = MemoryStorage::shared();
        let store = FavoritesStore::open(storage.clone());
        let id: ListId = "a".into();

        assert!(store.toggle(&id, "A"));
        assert!(FavoritesStore::open(storage.clone()).is_favorite(&id));

        assert!(!store.toggle(&id, "A"));
        assert!(!FavoritesStore::open(storage).is_favorite(&id));
    }
}
