//! Server configuration from environment variables.

use multiattach_core::defaults::{
    DB_MAX_CONNECTIONS, MAX_BODY_BYTES, SERVER_HOST, SERVER_PORT,
};
use multiattach_core::{ActionId, Error, Result};

/// Default database URL when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/multiattach";

/// Runtime configuration of the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// `WIZARD_ACTION_ID`; the action is looked up by name when unset.
    pub wizard_action: Option<ActionId>,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: SERVER_HOST.to_string(),
            port: SERVER_PORT,
            db_max_connections: DB_MAX_CONNECTIONS,
            wizard_action: None,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.db_max_connections),
            wizard_action: parse(&lookup, "WIZARD_ACTION_ID")?,
            max_body_bytes: parse(&lookup, "MAX_BODY_BYTES")?.unwrap_or(defaults.max_body_bytes),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config(&[]).unwrap(), ApiConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://db/attach"),
            ("PORT", "8080"),
            ("WIZARD_ACTION_ID", "42"),
            ("DB_MAX_CONNECTIONS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url, "postgres://db/attach");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.wizard_action, Some(42));
        assert_eq!(cfg.db_max_connections, 3);
        assert_eq!(cfg.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("PORT")));
    }

    #[test]
    fn test_blank_value_falls_back() {
        assert_eq!(config(&[("WIZARD_ACTION_ID", " ")]).unwrap().wizard_action, None);
    }
}
