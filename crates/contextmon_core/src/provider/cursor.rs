//! Materialized query results with change tracking.

use crate::notify::{ChangeFlag, ChangeNotifier, ObserverId};
use rusqlite::types::Value;
use std::sync::Arc;

/// Rows returned by a provider query.
///
/// While alive, the cursor stays registered for changes on its query address
/// (including changes to single items under a collection address).
pub struct BroadcastCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    watch: Option<CursorWatch>,
}

struct CursorWatch {
    address: String,
    flag: Arc<ChangeFlag>,
    notifier: Arc<dyn ChangeNotifier>,
    observer_id: ObserverId,
}

impl Drop for CursorWatch {
    fn drop(&mut self) {
        self.notifier.unregister_observer(self.observer_id);
    }
}

impl BroadcastCursor {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            watch: None,
        }
    }

    /// Registers this cursor with `notifier` for `address` and its descendants.
    pub(crate) fn watch(mut self, notifier: Arc<dyn ChangeNotifier>, address: String) -> Self {
        let flag = Arc::new(ChangeFlag::new());
        let observer_id = notifier.register_observer(&address, true, flag.clone());
        self.watch = Some(CursorWatch {
            address,
            flag,
            notifier,
            observer_id,
        });
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Address this cursor watches for changes.
    pub fn notification_address(&self) -> Option<&str> {
        self.watch.as_ref().map(|watch| watch.address.as_str())
    }

    /// Whether a change was published for the watched address since the query.
    pub fn has_changed(&self) -> bool {
        self.watch
            .as_ref()
            .is_some_and(|watch| watch.flag.is_set())
    }
}

impl std::fmt::Debug for BroadcastCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastCursor")
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .field("notification_address", &self.notification_address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::BroadcastCursor;
    use crate::notify::{ChangeNotifier, ObserverRegistry};
    use rusqlite::types::Value;
    use std::sync::Arc;

    fn sample() -> BroadcastCursor {
        BroadcastCursor::new(
            vec!["_id".to_string(), "action".to_string()],
            vec![
                vec![Value::Integer(1), Value::Text("SCREEN_ON".to_string())],
                vec![Value::Integer(2), Value::Text("SCREEN_OFF".to_string())],
            ],
        )
    }

    #[test]
    fn looks_up_values_by_column_name() {
        let cursor = sample();
        assert_eq!(cursor.len(), 2);
        assert_eq!(
            cursor.value(1, "action"),
            Some(&Value::Text("SCREEN_OFF".to_string()))
        );
        assert_eq!(cursor.value(0, "extras"), None);
        assert_eq!(cursor.value(5, "_id"), None);
        assert!(!cursor.has_changed());
    }

    #[test]
    fn watch_registers_and_drop_unregisters() {
        let registry = Arc::new(ObserverRegistry::new());
        let cursor = sample().watch(registry.clone(), "content://a/broadcasts".to_string());
        assert_eq!(registry.len(), 1);
        assert_eq!(cursor.notification_address(), Some("content://a/broadcasts"));

        registry.notify_change("content://a/broadcasts/2");
        assert!(cursor.has_changed());

        drop(cursor);
        assert!(registry.is_empty());
    }
}
