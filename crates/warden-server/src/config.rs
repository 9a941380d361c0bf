//! Server configuration sourced from environment variables.

use std::env::{self, VarError};

use anyhow::{Context, Result, bail};
use warden_db::DbConfig;

/// Log directive applied when neither `WARDEN_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "warden=info";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Build a config from an arbitrary variable source. Unset variables
    /// keep their defaults; set-but-unreadable or empty ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: String| -> Result<String> {
            match lookup(key) {
                Ok(value) if value.trim().is_empty() => bail!("{key} is set but empty"),
                Ok(value) => Ok(value),
                Err(VarError::NotPresent) => Ok(default),
                Err(err) => Err(err).with_context(|| format!("read {key}")),
            }
        };

        let log_filter = match lookup("WARDEN_LOG") {
            Err(VarError::NotPresent) => match lookup("RUST_LOG") {
                Ok(value) if !value.trim().is_empty() => value,
                _ => defaults.log_filter,
            },
            _ => read("WARDEN_LOG", defaults.log_filter)?,
        };

        Ok(Self {
            db: DbConfig {
                url: read("WARDEN_DB_URL", defaults.db.url)?,
                namespace: read("WARDEN_DB_NAMESPACE", defaults.db.namespace)?,
                database: read("WARDEN_DB_DATABASE", defaults.db.database)?,
                username: read("WARDEN_DB_USER", defaults.db.username)?,
                password: read("WARDEN_DB_PASSWORD", defaults.db.password)?,
            },
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.url, "127.0.0.1:8000");
        assert_eq!(config.db.namespace, "warden");
        assert_eq!(config.db.database, "rbac");
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("WARDEN_DB_URL", "db.internal:8000"),
            ("WARDEN_DB_NAMESPACE", "acme"),
            ("WARDEN_DB_USER", "warden"),
            ("WARDEN_LOG", "warden=debug"),
        ]))
        .unwrap();
        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.db.namespace, "acme");
        assert_eq!(config.db.database, "rbac");
        assert_eq!(config.db.username, "warden");
        assert_eq!(config.log_filter, "warden=debug");
    }

    #[test]
    fn rust_log_is_the_fallback_filter() {
        let config =
            ServerConfig::from_lookup(lookup(&[("RUST_LOG", "warden_db=trace")])).unwrap();
        assert_eq!(config.log_filter, "warden_db=trace");

        let config = ServerConfig::from_lookup(lookup(&[
            ("RUST_LOG", "warden_db=trace"),
            ("WARDEN_LOG", "warden=warn"),
        ]))
        .unwrap();
        assert_eq!(config.log_filter, "warden=warn");
    }

    #[test]
    fn empty_value_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("WARDEN_DB_URL", " ")])).unwrap_err();
        assert!(err.to_string().contains("WARDEN_DB_URL"));
    }
}
