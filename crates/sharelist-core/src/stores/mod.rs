//! Client-side stores.
//!
//! Each store owns its in-memory snapshot and publishes it through a
//! `tokio::sync::watch` channel. Remote-backed stores take their backend by
//! value; locally cached stores take a shared key-value storage handle.

mod favorites;
mod history;
mod last_seen;
mod list;
mod settings;
mod todos;
mod token;

pub use favorites::{FavoritesStore, FAVORITES_KEY};
pub use history::{HistoryStore, HISTORY_KEY, MAX_HISTORY};
pub use last_seen::{LastSeenTracker, Visibility, LAST_SEEN_KEY, REFRESH_INTERVAL};
pub use list::{ListState, ListStore};
pub use settings::{DisplaySettings, SortSettings, SORT_BY_KEY, SORT_DIRECTION_KEY, WIDE_MODE_KEY};
pub use todos::{MoveDirection, TodosState, TodosStore};
pub use token::{BusyFlag, BusyGuard, OperationTokens};

/// Result of an optimistic mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied locally and persisted remotely
    Committed,
    /// Nothing to do, or refused because a conflicting operation is in flight
    Ignored,
    /// Remote write failed; the local change was reverted and the error set
    RolledBack,
    /// Remote write failed after a newer mutation started; local state kept
    Superseded,
}

impl MutationOutcome {
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::RolledBack | Self::Superseded)
    }
}
