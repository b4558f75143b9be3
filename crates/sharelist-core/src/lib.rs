//! sharelist-core - Core library for Sharelist
//!
//! This crate contains the shared models, remote table backends, local storage
//! mirrors, and the optimistic client stores used by the Sharelist API server
//! and CLI.

pub mod config;
pub mod csv;
pub mod error;
pub mod models;
pub mod remote;
pub mod storage;
pub mod stores;
pub mod util;

pub use config::ClientConfig;
pub use error::{Error, RemoteError, Result};
pub use models::{ListEntry, ListId, NewTask, Task, TaskId, TaskPatch, TaskStatus};
pub use stores::MutationOutcome;
