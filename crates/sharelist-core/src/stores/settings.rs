//! Sort and display preferences.

use crate::models::{sort_tasks, SortBy, SortDirection, Task};
use crate::storage::{Persistent, SharedStorage};

pub const SORT_BY_KEY: &str = "sortBy";
pub const SORT_DIRECTION_KEY: &str = "sortDirection";
pub const WIDE_MODE_KEY: &str = "wideMode";

#[derive(Debug)]
pub struct SortSettings {
    by: Persistent<SortBy>,
    direction: Persistent<SortDirection>,
}

impl SortSettings {
    pub fn open(storage: SharedStorage) -> Self {
        Self {
            by: Persistent::open(storage.clone(), SORT_BY_KEY, SortBy::default()),
            direction: Persistent::open(storage, SORT_DIRECTION_KEY, SortDirection::default()),
        }
    }

    pub fn by(&self) -> SortBy {
        self.by.get()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction.get()
    }

    pub fn set_by(&self, by: SortBy) {
        self.by.set(by);
    }

    pub fn set_direction(&self, direction: SortDirection) {
        self.direction.set(direction);
    }

    /// Tasks in the configured display order
    pub fn sorted(&self, tasks: &[Task]) -> Vec<Task> {
        let mut sorted = tasks.to_vec();
        sort_tasks(&mut sorted, self.by(), self.direction());
        sorted
    }
}

#[derive(Debug)]
pub struct DisplaySettings {
    wide_mode: Persistent<bool>,
}

impl DisplaySettings {
    pub fn open(storage: SharedStorage) -> Self {
        Self {
            wide_mode: Persistent::open(storage, WIDE_MODE_KEY, false),
        }
    }

    pub fn wide_mode(&self) -> bool {
        self.wide_mode.get()
    }

    /// Flip wide mode and return the new value
    pub fn toggle(&self) -> bool {
        self.wide_mode.update(|wide| *wide = !*wide);
        self.wide_mode()
    }
}
