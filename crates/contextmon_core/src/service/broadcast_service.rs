//! Broadcast use-case service.
//!
//! # Responsibility
//! - Offer typed entry points for recording broadcasts and tracking uploads.
//! - Go through the provider's address verbs so observers see every change.
//!
//! # Invariants
//! - New records are validated before insert and always start not-uploaded.
//! - Rows that cannot be mapped to [`BroadcastRecord`] are reported, not
//!   skipped.

use crate::model::broadcast::{
    BroadcastId, BroadcastRecord, BroadcastValidationError, NewBroadcast, COLUMN_ACTION,
    COLUMN_EXTRAS, COLUMN_ID, COLUMN_TIMESTAMP, COLUMN_UPLOADED, TABLE_NAME,
};
use crate::model::values::FieldValues;
use crate::provider::broadcast_provider::{BroadcastProvider, QueryRequest};
use crate::provider::cursor::BroadcastCursor;
use crate::provider::selection::Selection;
use crate::provider::ProviderError;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from broadcast service operations.
#[derive(Debug)]
pub enum ServiceError {
    Validation(BroadcastValidationError),
    Provider(ProviderError),
    /// A stored row or returned address could not be interpreted.
    InvalidData(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Provider(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid broadcast data: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<BroadcastValidationError> for ServiceError {
    fn from(value: BroadcastValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ProviderError> for ServiceError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

/// Typed facade over a [`BroadcastProvider`].
pub struct BroadcastService<P: BroadcastProvider> {
    provider: P,
}

impl<P: BroadcastProvider> BroadcastService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Stores one observed broadcast and returns its id.
    pub fn record(&self, broadcast: &NewBroadcast) -> ServiceResult<BroadcastId> {
        broadcast.validate()?;
        let address = self.provider.insert(
            &self.provider.collection_address(),
            &broadcast.to_field_values(),
        )?;
        parse_inserted_id(&address)
    }

    pub fn get(&self, id: BroadcastId) -> ServiceResult<Option<BroadcastRecord>> {
        let cursor = self
            .provider
            .query(&self.provider.item_address(id), &QueryRequest::all())?;
        Ok(to_records(&cursor)?.into_iter().next())
    }

    /// Not-yet-uploaded records, oldest first.
    pub fn list_pending_uploads(&self, limit: u32) -> ServiceResult<Vec<BroadcastRecord>> {
        let request = QueryRequest::all()
            .with_selection(Selection::new(format!("{COLUMN_UPLOADED} = ?"), [0_i64]))
            .with_sort_order(format!("{COLUMN_TIMESTAMP} ASC, {COLUMN_ID} ASC"))
            .with_limit(limit);
        let cursor = self
            .provider
            .query(&self.provider.collection_address(), &request)?;
        to_records(&cursor)
    }

    /// Flags the given ids as uploaded. Returns the number of rows changed.
    pub fn mark_uploaded(&self, ids: &[BroadcastId]) -> ServiceResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let selection = Selection::new(
            format!("{COLUMN_ID} IN ({placeholders})"),
            ids.iter().copied(),
        );
        let values = FieldValues::new().put(COLUMN_UPLOADED, true);
        Ok(self
            .provider
            .update(&self.provider.collection_address(), &values, &selection)?)
    }

    /// Deletes every record already uploaded.
    pub fn purge_uploaded(&self) -> ServiceResult<usize> {
        let selection = Selection::new(format!("{COLUMN_UPLOADED} = ?"), [1_i64]);
        Ok(self
            .provider
            .delete(&self.provider.collection_address(), &selection)?)
    }
}

fn parse_inserted_id(address: &str) -> ServiceResult<BroadcastId> {
    address
        .strip_prefix(TABLE_NAME)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| ServiceError::InvalidData(format!("unexpected insert address `{address}`")))
}

/// Maps every cursor row onto a [`BroadcastRecord`].
///
/// The cursor must carry all known columns (an empty projection does).
pub fn to_records(cursor: &BroadcastCursor) -> ServiceResult<Vec<BroadcastRecord>> {
    (0..cursor.len())
        .map(|row| parse_record(cursor, row))
        .collect()
}

fn parse_record(cursor: &BroadcastCursor, row: usize) -> ServiceResult<BroadcastRecord> {
    let column = |name: &'static str| {
        cursor
            .value(row, name)
            .ok_or_else(|| ServiceError::InvalidData(format!("missing column `{name}`")))
    };

    let uploaded = match column(COLUMN_UPLOADED)? {
        Value::Integer(0) => false,
        Value::Integer(1) => true,
        other => {
            return Err(ServiceError::InvalidData(format!(
                "invalid uploaded value `{other:?}` in broadcasts.uploaded"
            )));
        }
    };

    let extras = match column(COLUMN_EXTRAS)? {
        Value::Null => None,
        Value::Text(text) => Some(text.clone()),
        other => {
            return Err(ServiceError::InvalidData(format!(
                "invalid extras value `{other:?}` in broadcasts.extras"
            )));
        }
    };

    Ok(BroadcastRecord {
        id: integer(column(COLUMN_ID)?, COLUMN_ID)?,
        action: text(column(COLUMN_ACTION)?, COLUMN_ACTION)?,
        extras,
        timestamp: integer(column(COLUMN_TIMESTAMP)?, COLUMN_TIMESTAMP)?,
        uploaded,
    })
}

fn integer(value: &Value, column: &str) -> ServiceResult<i64> {
    match value {
        Value::Integer(number) => Ok(*number),
        other => Err(ServiceError::InvalidData(format!(
            "expected integer in broadcasts.{column}, got `{other:?}`"
        ))),
    }
}

fn text(value: &Value, column: &str) -> ServiceResult<String> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        other => Err(ServiceError::InvalidData(format!(
            "expected text in broadcasts.{column}, got `{other:?}`"
        ))),
    }
}
