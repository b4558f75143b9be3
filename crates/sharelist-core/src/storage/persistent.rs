//! A typed value mirrored under one storage key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use super::SharedStorage;

/// Typed value kept in memory and written back as JSON on every change.
///
/// Storage failures and corrupted values are logged and never surface to the
/// caller; the in-memory value stays authoritative for the session.
#[derive(Debug)]
pub struct Persistent<T> {
    key: String,
    storage: SharedStorage,
    value: watch::Sender<T>,
}

impl<T> Persistent<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Load the stored value, falling back to `default` when absent or unreadable
    pub fn open(storage: SharedStorage, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let initial = match storage.get_item(&key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(error) => {
                    tracing::warn!(key = %key, %error, "Stored value is not valid JSON, using default");
                    default
                }
            },
            Ok(None) => default,
            Err(error) => {
                tracing::warn!(key = %key, %error, "Failed to read stored value, using default");
                default
            }
        };

        let (value, _) = watch::channel(initial);
        let mirror = Self {
            key,
            storage,
            value,
        };
        mirror.persist();
        mirror
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.value.borrow())
    }

    pub fn set(&self, value: T) {
        self.value.send_replace(value);
        self.persist();
    }

    pub fn update(&self, modify: impl FnOnce(&mut T)) {
        self.value.send_modify(modify);
        self.persist();
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    fn persist(&self) {
        let serialized = match serde_json::to_string(&*self.value.borrow()) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Failed to serialize value");
                return;
            }
        };
        if let Err(error) = self.storage.set_item(&self.key, &serialized) {
            tracing::warn!(key = %self.key, %error, "Failed to write stored value");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::storage::MemoryStorage;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn missing_key_uses_default_and_writes_it_back() {
        let storage = MemoryStorage::shared();
        let mirror = Persistent::open(storage.clone(), "todo-list-wideMode", false);
        assert!(!mirror.get());
        assert_eq!(
            storage.get_item("todo-list-wideMode").unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn corrupted_value_falls_back_to_default() {
        let storage = MemoryStorage::shared();
        storage.set_item("todo-list-history", "{not json").unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mirror: Persistent<Vec<String>> = tracing::subscriber::with_default(subscriber, || {
            Persistent::open(storage.clone(), "todo-list-history", Vec::new())
        });
        assert_eq!(mirror.get(), Vec::<String>::new());
        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("Stored value is not valid JSON"), "{output}");
        assert!(output.contains("todo-list-history"), "{output}");
        assert_eq!(
            storage.get_item("todo-list-history").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn stored_value_is_loaded() {
        let storage = MemoryStorage::shared();
        storage.set_item("todo-list-sortBy", "\"name\"").unwrap();
        let mirror = Persistent::open(storage, "todo-list-sortBy", "order".to_string());
        assert_eq!(mirror.get(), "name");
    }

    #[test]
    fn every_change_is_written_immediately() {
        let storage = MemoryStorage::shared();
        let mirror = Persistent::open(storage.clone(), "numbers", vec![1]);

        mirror.update(|numbers| numbers.push(2));
        assert_eq!(storage.get_item("numbers").unwrap().as_deref(), Some("[1,2]"));

        mirror.set(vec![7]);
        assert_eq!(storage.get_item("numbers").unwrap().as_deref(), Some("[7]"));
        assert_eq!(mirror.with(Vec::len), 1);
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let mirror = Persistent::open(MemoryStorage::shared(), "counter", 0_u32);
        let mut receiver = mirror.subscribe();

        mirror.update(|value| *value += 1);
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), 1);
    }
}
