//! Address-based data access for recorded system broadcasts.
//!
//! Callers name either the whole `broadcasts` collection or one row through a
//! `content://<authority>/broadcasts[/<id>]` address and use four verbs:
//! query, insert, update and delete. Every successful mutation publishes a
//! change notification for its address.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod provider;
pub mod service;

pub use config::{open_store, ConfigError, ProviderConfig, DEFAULT_AUTHORITY};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::broadcast::{
    BroadcastId, BroadcastRecord, BroadcastValidationError, NewBroadcast, KNOWN_COLUMNS,
};
pub use model::values::{ColumnValue, FieldValues};
pub use notify::{
    ChangeFlag, ChangeNotifier, ChangeObserver, NotifyOutcome, ObserverId, ObserverRegistry,
};
pub use provider::address::{AddressMatcher, Route};
pub use provider::broadcast_provider::{
    BroadcastProvider, QueryRequest, SqliteBroadcastProvider,
};
pub use provider::cursor::BroadcastCursor;
pub use provider::selection::Selection;
pub use provider::{ProviderError, ProviderResult};
pub use service::broadcast_service::{BroadcastService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
