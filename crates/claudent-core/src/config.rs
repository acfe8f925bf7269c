//! Core runtime configuration.
//!
//! Resolved once at startup and passed into [`crate::context::AppContext`].
//! Nothing below reads environment variables after construction.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audit::DEFAULT_PAGE_SIZE;

pub const ENV_DB_PATH: &str = "CLAUDENT_DB_PATH";
pub const ENV_SESSION_ID_PATH: &str = "CLAUDENT_SESSION_ID_PATH";
pub const ENV_AUDIT_PAGE_SIZE: &str = "CLAUDENT_AUDIT_PAGE_SIZE";

pub const DEFAULT_DB_PATH: &str = "claudent.db";
pub const DEFAULT_SESSION_ID_PATH: &str = ".claudent_session_id";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),

    #[error("Invalid audit page size: {0}")]
    InvalidPageSize(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    db_path: PathBuf,
    session_id_path: PathBuf,
    audit_page_size: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(db_path: PathBuf, session_id_path: PathBuf, audit_page_size: usize) -> ConfigResult<Self> {
        if db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("db_path"));
        }
        if session_id_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("session_id_path"));
        }
        if audit_page_size == 0 {
            return Err(ConfigError::InvalidPageSize("0".into()));
        }
        Ok(Self {
            db_path,
            session_id_path,
            audit_page_size,
        })
    }

    /// Read `CLAUDENT_*` variables, falling back to defaults.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let session_id_path =
            lookup(ENV_SESSION_ID_PATH).unwrap_or_else(|| DEFAULT_SESSION_ID_PATH.into());
        let audit_page_size = match lookup(ENV_AUDIT_PAGE_SIZE) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidPageSize(raw.clone()))?,
            None => DEFAULT_PAGE_SIZE,
        };
        Self::new(db_path.into(), session_id_path.into(), audit_page_size)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn session_id_path(&self) -> &Path {
        &self.session_id_path
    }

    pub fn audit_page_size(&self) -> usize {
        self.audit_page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path(), Path::new("claudent.db"));
        assert_eq!(config.session_id_path(), Path::new(".claudent_session_id"));
        assert_eq!(config.audit_page_size(), 10);
    }

    #[test]
    fn test_overrides() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/var/lib/claudent/data.db"),
            (ENV_AUDIT_PAGE_SIZE, " 25 "),
        ]))
        .unwrap();
        assert_eq!(config.db_path(), Path::new("/var/lib/claudent/data.db"));
        assert_eq!(config.audit_page_size(), 25);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            CoreConfig::from_lookup(lookup(&[(ENV_AUDIT_PAGE_SIZE, "ten")])),
            Err(ConfigError::InvalidPageSize("ten".into()))
        );
        assert_eq!(
            CoreConfig::from_lookup(lookup(&[(ENV_DB_PATH, "")])),
            Err(ConfigError::EmptyPath("db_path"))
        );
        assert!(CoreConfig::new("a.db".into(), "sid".into(), 0).is_err());
    }
}
