//! Broadcast record model.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused or mutated.
//! - `action` and `timestamp` are fixed at creation.
//! - `uploaded` is the only field expected to change after insert.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::values::FieldValues;

/// Store-assigned row identifier.
pub type BroadcastId = i64;

pub const TABLE_NAME: &str = "broadcasts";

pub const COLUMN_ID: &str = "_id";
pub const COLUMN_ACTION: &str = "action";
pub const COLUMN_EXTRAS: &str = "extras";
pub const COLUMN_TIMESTAMP: &str = "timestamp";
pub const COLUMN_UPLOADED: &str = "uploaded";

/// Projection alias accepted for `_id`.
pub const COLUMN_ID_ALIAS: &str = "id";

/// Columns in table order. A read may only request names from this set.
pub const KNOWN_COLUMNS: [&str; 5] = [
    COLUMN_ID,
    COLUMN_ACTION,
    COLUMN_EXTRAS,
    COLUMN_TIMESTAMP,
    COLUMN_UPLOADED,
];

/// Returns whether `name` may appear in a read projection.
pub fn is_known_column(name: &str) -> bool {
    name == COLUMN_ID_ALIAS || KNOWN_COLUMNS.contains(&name)
}

/// One persisted broadcast row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub id: BroadcastId,
    /// Intent action name, e.g. `android.intent.action.BOOT_COMPLETED`.
    pub action: String,
    /// Serialized event metadata, stored verbatim.
    pub extras: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub uploaded: bool,
}

/// Insert model for a freshly observed broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBroadcast {
    pub action: String,
    pub extras: Option<String>,
    pub timestamp: i64,
}

impl NewBroadcast {
    pub fn new(action: impl Into<String>, timestamp: i64) -> Self {
        Self {
            action: action.into(),
            extras: None,
            timestamp,
        }
    }

    pub fn with_extras(mut self, extras: impl Into<String>) -> Self {
        self.extras = Some(extras.into());
        self
    }

    /// Checks record-level invariants before the row reaches the store.
    pub fn validate(&self) -> Result<(), BroadcastValidationError> {
        if self.action.trim().is_empty() {
            return Err(BroadcastValidationError::BlankAction);
        }
        if self.timestamp < 0 {
            return Err(BroadcastValidationError::NegativeTimestamp(self.timestamp));
        }
        Ok(())
    }

    /// Field values for a fresh, not-yet-uploaded row.
    pub fn to_field_values(&self) -> FieldValues {
        FieldValues::new()
            .put(COLUMN_ACTION, self.action.as_str())
            .put(COLUMN_EXTRAS, self.extras.clone())
            .put(COLUMN_TIMESTAMP, self.timestamp)
            .put(COLUMN_UPLOADED, false)
    }
}

/// Invariant violations on [`NewBroadcast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastValidationError {
    BlankAction,
    NegativeTimestamp(i64),
}

impl Display for BroadcastValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankAction => write!(f, "broadcast action must not be blank"),
            Self::NegativeTimestamp(value) => {
                write!(f, "broadcast timestamp must not be negative: {value}")
            }
        }
    }
}

impl Error for BroadcastValidationError {}

#[cfg(test)]
mod tests {
    use super::{is_known_column, BroadcastValidationError, NewBroadcast};
    use rusqlite::types::Value;

    #[test]
    fn known_columns_accept_id_alias_only_as_extra_name() {
        for name in ["_id", "id", "action", "extras", "timestamp", "uploaded"] {
            assert!(is_known_column(name), "{name} should be known");
        }
        assert!(!is_known_column("ID"));
        assert!(!is_known_column("payload"));
    }

    #[test]
    fn validate_rejects_blank_action_and_negative_timestamp() {
        assert_eq!(
            NewBroadcast::new("   ", 1).validate(),
            Err(BroadcastValidationError::BlankAction)
        );
        assert_eq!(
            NewBroadcast::new("BOOT_COMPLETED", -5).validate(),
            Err(BroadcastValidationError::NegativeTimestamp(-5))
        );
        assert!(NewBroadcast::new("BOOT_COMPLETED", 0).validate().is_ok());
    }

    #[test]
    fn field_values_start_not_uploaded() {
        let values = NewBroadcast::new("SCREEN_ON", 42)
            .with_extras("{}")
            .to_field_values();
        assert_eq!(values.get("uploaded"), Some(&Value::Integer(0)));
        assert_eq!(values.get("extras"), Some(&Value::Text("{}".to_string())));
        assert_eq!(values.len(), 4);
    }
}
