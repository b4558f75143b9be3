//! Data models for Sharelist

mod list;
mod settings;
mod task;

pub use list::{ListEntry, ListId, DEFAULT_LIST_TITLE};
pub use settings::{sort_tasks, SortBy, SortDirection};
pub use task::{
    clamp_difficulty, ordered_tasks, NewTask, Task, TaskId, TaskPatch, TaskStatus, MAX_DIFFICULTY,
    TEMP_ID_PREFIX,
};
