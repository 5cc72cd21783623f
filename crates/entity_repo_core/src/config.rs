//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe database, table naming and logging settings in one place.
//! - Load settings from defaults, an optional JSON file and the environment.
//!
//! # Invariants
//! - Precedence is defaults < file < environment.
//! - A loaded config always carries a valid table prefix.

use crate::executor::TableNaming;
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "ENTITY_REPO_DB_PATH";
pub const ENV_TABLE_PREFIX: &str = "ENTITY_REPO_TABLE_PREFIX";
pub const ENV_LOG_LEVEL: &str = "ENTITY_REPO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ENTITY_REPO_LOG_DIR";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration for the core crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    /// Prepended to every logical table name. Empty means no prefix.
    pub table_prefix: String,
    pub log: LogConfig,
}

/// Connection settings consumed by `db::open_db_with_config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    /// File logging is only started when a directory is configured.
    pub dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads config from an optional JSON file, then applies env overrides.
    ///
    /// # Errors
    /// - Returns `Io`/`Parse` when the file cannot be read or decoded.
    /// - Returns `Invalid` when the resulting table prefix is not an identifier.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses JSON config text. Missing sections fall back to defaults.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a key lookup, typically the process environment.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_DB_PATH) {
            let trimmed = path.trim();
            self.database.path = if trimmed.is_empty() || trimmed == ":memory:" {
                None
            } else {
                Some(PathBuf::from(trimmed))
            };
        }
        if let Some(prefix) = lookup(ENV_TABLE_PREFIX) {
            self.table_prefix = prefix.trim().to_string();
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log.level = level.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            let trimmed = dir.trim();
            self.log.dir = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.table_naming().map(|_| ())
    }

    /// Builds the table naming convention described by this config.
    pub fn table_naming(&self) -> ConfigResult<TableNaming> {
        TableNaming::new(&self.table_prefix).map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_TABLE_PREFIX};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = CoreConfig::from_json_str(r#"{ "table_prefix": "app_" }"#)
            .expect("partial config should parse");

        assert_eq!(config.table_prefix, "app_");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.database.foreign_keys);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{ "tabel_prefix": "x_" }"#)
            .expect_err("typo should be rejected");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{ "table_prefix": "bad prefix;" }"#)
            .expect_err("prefix with spaces should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn overrides_take_precedence_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/tmp/override.db"),
            (ENV_TABLE_PREFIX, " env_ "),
            (ENV_LOG_DIR, ""),
        ]);
        let base = CoreConfig::from_json_str(
            r#"{ "table_prefix": "file_", "log": { "dir": "/var/log/entity" } }"#,
        )
        .expect("config should parse");

        let config = base.with_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/override.db")));
        assert_eq!(config.table_prefix, "env_");
        assert!(config.log.dir.is_none());
    }

    #[test]
    fn memory_marker_selects_in_memory_database() {
        let config = CoreConfig::default().with_overrides(|key| {
            (key == ENV_DB_PATH).then(|| ":memory:".to_string())
        });
        assert!(config.database.path.is_none());
    }
}
