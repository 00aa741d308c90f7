//! Broadcast table schema and record types.
//!
//! # Responsibility
//! - Name the `broadcasts` table and its known columns.
//! - Define typed row/insert models and untyped field-value maps.

pub mod broadcast;
pub mod values;
