//! Client configuration shared by the API server and the CLI.
//!
//! Values come from the environment (optionally a `.env` file loaded by the
//! binaries). Lookups go through a closure so tests never touch process env.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option, parse_flag};

pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const AUTO_PROVISION_VAR: &str = "SHARELIST_AUTO_PROVISION";
pub const STORAGE_DIR_VAR: &str = "SHARELIST_STORAGE_DIR";

/// Connection settings for the hosted tables plus local cache location
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Create the `lists` table through `execute_sql` when it is missing
    pub auto_provision: bool,
    /// Directory for the local key-value mirrors, platform default when `None`
    pub storage_dir: Option<PathBuf>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"[REDACTED]")
            .field("auto_provision", &self.auto_provision)
            .field("storage_dir", &self.storage_dir)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let supabase_url = required_trimmed(&lookup, SUPABASE_URL_VAR)?;
        if !is_http_url(&supabase_url) {
            return Err(Error::Config(format!(
                "{SUPABASE_URL_VAR} must start with http:// or https://"
            )));
        }
        let supabase_anon_key = required_trimmed(&lookup, SUPABASE_ANON_KEY_VAR)?;

        let auto_provision = optional_trimmed(&lookup, AUTO_PROVISION_VAR)
            .is_some_and(|value| parse_flag(&value));
        let storage_dir = optional_trimmed(&lookup, STORAGE_DIR_VAR).map(PathBuf::from);

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            auto_provision,
            storage_dir,
        })
    }
}

fn required_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional_trimmed(lookup, name)
        .ok_or_else(|| Error::Config(format!("Missing required environment variable: {name}")))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}
