use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;

use sharelist_core::ClientConfig;
use thiserror::Error;

const BIND_ADDR_VAR: &str = "SHARELIST_API_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Client(#[from] sharelist_core::Error),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub client: ClientConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("client", &self.client)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, BIND_ADDR_VAR, DEFAULT_BIND_ADDR);
        if bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "{BIND_ADDR_VAR} must be a socket address such as {DEFAULT_BIND_ADDR}"
            )));
        }

        let client = ClientConfig::from_lookup(&lookup)?;
        Ok(Self { bind_addr, client })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_supabase_settings() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn config_defaults_bind_addr_and_redacts_key() {
        let config = config_from(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "sensitive-anon-key"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-anon-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn config_rejects_invalid_bind_addr() {
        let err = config_from(&[
            (BIND_ADDR_VAR, "localhost"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains(BIND_ADDR_VAR));
    }
}
