//! Periodic "last seen" timestamp while a session is visible.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::storage::{Persistent, SharedStorage};
use crate::util::unix_millis_now;

pub const LAST_SEEN_KEY: &str = "todo-list-lastSeen";

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Background task refreshing `todo-list-lastSeen` (unix ms).
///
/// Every visibility change writes once; while hidden the periodic refresh is
/// paused. Dropping the tracker without [`Self::stop`] aborts the task.
#[derive(Debug)]
pub struct LastSeenTracker {
    mirror: Arc<Persistent<i64>>,
    visibility: Option<watch::Sender<Visibility>>,
    handle: Option<JoinHandle<()>>,
}

impl LastSeenTracker {
    pub fn start(storage: SharedStorage) -> Self {
        Self::start_with_interval(storage, REFRESH_INTERVAL)
    }

    pub fn start_with_interval(storage: SharedStorage, period: Duration) -> Self {
        let mirror = Arc::new(Persistent::open(storage, LAST_SEEN_KEY, 0_i64));
        let (visibility, receiver) = watch::channel(Visibility::Visible);
        let handle = tokio::spawn(track(Arc::clone(&mirror), receiver, period));
        Self {
            mirror,
            visibility: Some(visibility),
            handle: Some(handle),
        }
    }

    pub fn last_seen(&self) -> i64 {
        self.mirror.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.mirror.subscribe()
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        if let Some(sender) = &self.visibility {
            sender.send_replace(visibility);
        }
    }

    /// End the refresh task and wait for it to exit
    pub async fn stop(mut self) {
        self.visibility.take();
        if let Some(handle) = self.handle.take() {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "Last-seen tracker ended abnormally");
            }
        }
    }
}

impl Drop for LastSeenTracker {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

async fn track(
    mirror: Arc<Persistent<i64>>,
    mut visibility: watch::Receiver<Visibility>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let visible = *visibility.borrow_and_update() == Visibility::Visible;
        if visible {
            tokio::select! {
                _ = interval.tick() => mirror.set(unix_millis_now()),
                changed = visibility.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    mirror.set(unix_millis_now());
                    interval.reset();
                }
            }
        } else {
            if visibility.changed().await.is_err() {
                break;
            }
            mirror.set(unix_millis_now());
            interval.reset();
        }
    }
    tracing::debug!("Last-seen tracker stopped");
}
