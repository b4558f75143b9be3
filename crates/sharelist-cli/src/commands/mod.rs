pub mod common;
pub mod completions;
pub mod export;
pub mod history;
pub mod import;
pub mod list;
pub mod settings;
pub mod tasks;
