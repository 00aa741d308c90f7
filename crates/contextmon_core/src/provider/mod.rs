//! URI-addressed data access over the `broadcasts` table.
//!
//! # Responsibility
//! - Route addresses to the whole collection or one row.
//! - Validate projections, compose id-scoped filters and execute single
//!   statements against SQLite.
//! - Publish a change notification after every successful mutation.
//!
//! # Invariants
//! - Item ids are always bound as parameters, never spliced into SQL text.
//! - Store errors reach the caller unchanged inside [`ProviderError::Store`].
//! - Nothing is cached; each call round-trips to the store.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod address;
pub mod broadcast_provider;
pub mod cursor;
pub mod selection;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised by provider construction and the four data verbs.
#[derive(Debug)]
pub enum ProviderError {
    /// Address matches neither pattern, or has the wrong kind for the verb.
    UnrecognizedAddress(String),
    /// Projection names a column outside the known set.
    UnknownColumn(String),
    /// Update called without any values to write.
    EmptyValues,
    /// Filter uses a numbered or named parameter instead of anonymous `?`.
    UnsupportedPlaceholder(String),
    /// Authority token is blank or contains path/whitespace characters.
    InvalidAuthority(String),
    /// Store failure, passed through untranslated.
    Store(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedAddress(address) => write!(f, "unknown address: {address}"),
            Self::UnknownColumn(column) => write!(f, "unknown column in projection: {column}"),
            Self::EmptyValues => write!(f, "update requires at least one column value"),
            Self::UnsupportedPlaceholder(token) => write!(
                f,
                "filter placeholder `{token}` is not supported; use anonymous `?`"
            ),
            Self::InvalidAuthority(value) => write!(f, "invalid provider authority `{value}`"),
            Self::Store(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column missing: {table}.{column}")
            }
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ProviderError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(value))
    }
}
