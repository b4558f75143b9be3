//! Error types for sharelist-core

use serde::Deserialize;
use thiserror::Error;

/// `PostgreSQL` code for "relation does not exist".
pub const RELATION_MISSING_CODE: &str = "42P01";

/// `PostgREST` code for "no rows returned for a single-object request".
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Result type alias using sharelist-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sharelist-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The remote table API rejected the request
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task or list not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed CSV payload
    #[error("CSV error: {0}")]
    Csv(String),

    /// Local key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error means the `lists`/`todos` relation was never provisioned.
    pub fn is_relation_missing(&self) -> bool {
        matches!(self, Self::Remote(remote) if remote.is_relation_missing())
    }

    /// Whether this error means a single-row lookup matched nothing.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Remote(remote) if remote.is_no_rows())
    }
}

/// Error payload returned by the hosted table API.
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[error("{message}")]
pub struct RemoteError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl RemoteError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn relation_missing(relation: &str) -> Self {
        Self::new(
            Some(RELATION_MISSING_CODE),
            format!("relation \"public.{relation}\" does not exist"),
        )
    }

    pub fn no_rows() -> Self {
        Self::new(
            Some(NO_ROWS_CODE),
            "JSON object requested, multiple (or no) rows returned",
        )
    }

    pub fn is_relation_missing(&self) -> bool {
        self.code.as_deref() == Some(RELATION_MISSING_CODE)
    }

    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS_CODE)
    }
}
