//! Provider configuration.
//!
//! # Responsibility
//! - Describe where the broadcast store lives and which authority it answers.
//! - Carry logging settings for process bootstrap.
//!
//! # Invariants
//! - Missing fields fall back to [`ProviderConfig::default`].
//! - A config is validated before a store is opened from it.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::{default_log_level, init_logging, LogLevel, LoggingError};
use crate::provider::address::AddressMatcher;
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_AUTHORITY: &str = "edu.unt.sell.contextmon";

/// Process-level settings for the broadcast provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Namespace token in `content://<authority>/broadcasts`.
    pub authority: String,
    /// SQLite file; `None` keeps the store in memory.
    pub database_path: Option<PathBuf>,
    /// Level for file logs; ignored when `log_dir` is `None`.
    pub log_level: LogLevel,
    /// Absolute directory for rolling log files. When set, [`open_store`]
    /// starts file logging there; `None` leaves logging to the host.
    pub log_dir: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            database_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl ProviderConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        AddressMatcher::new(&self.authority)
            .map_err(|_| ConfigError::InvalidAuthority(self.authority.clone()))?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}

/// Opens the store described by `config`, creating and migrating it if needed.
///
/// File logging starts first when `log_dir` is set, so the store open is
/// captured. Repeating the call with the same logging settings is fine.
pub fn open_store(config: &ProviderConfig) -> Result<Connection, ConfigError> {
    config.validate()?;
    if let Some(dir) = &config.log_dir {
        init_logging(config.log_level, dir).map_err(ConfigError::Logging)?;
    }
    let conn = match &config.database_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(ConfigError::Store)?;
    Ok(conn)
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidAuthority(String),
    RelativeLogDir(PathBuf),
    Logging(LoggingError),
    Store(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid provider config: {err}"),
            Self::InvalidAuthority(value) => write!(f, "invalid provider authority `{value}`"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::Logging(err) => write!(f, "failed to start logging: {err}"),
            Self::Store(err) => write!(f, "failed to open broadcast store: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidAuthority(_) | Self::RelativeLogDir(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ProviderConfig, DEFAULT_AUTHORITY};
    use crate::logging::LogLevel;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ProviderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.authority, DEFAULT_AUTHORITY);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn parses_all_fields() {
        let config = ProviderConfig::from_json_str(
            r#"{
                "authority": "org.example.monitor",
                "database_path": "/var/lib/contextmon/broadcasts.db",
                "log_level": "warn",
                "log_dir": "/var/log/contextmon"
            }"#,
        )
        .unwrap();
        assert_eq!(config.authority, "org.example.monitor");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(
            config.database_path.as_deref(),
            Some(std::path::Path::new("/var/lib/contextmon/broadcasts.db"))
        );
    }

    #[test]
    fn rejects_bad_authority_and_relative_log_dir() {
        assert!(matches!(
            ProviderConfig::from_json_str(r#"{"authority": "a/b"}"#),
            Err(ConfigError::InvalidAuthority(_))
        ));
        assert!(matches!(
            ProviderConfig::from_json_str(r#"{"log_dir": "logs"}"#),
            Err(ConfigError::RelativeLogDir(_))
        ));
        assert!(matches!(
            ProviderConfig::from_json_str(r#"{"log_level": "loud"}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
