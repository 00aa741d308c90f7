//! Use-case services layered over the provider.
//!
//! # Responsibility
//! - Turn address-based provider verbs into typed broadcast operations.
//! - Keep callers independent of SQL filter text and column names.

pub mod broadcast_service;
