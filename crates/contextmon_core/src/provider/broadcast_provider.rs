//! Broadcast provider contract and SQLite implementation.
//!
//! # Responsibility
//! - Execute query/insert/update/delete against the `broadcasts` table,
//!   scoped by the routed address.
//! - Publish one change notification per successful mutation.
//!
//! # Invariants
//! - Projections are validated before the address is resolved.
//! - Insert accepts only the collection address.
//! - Notification is published after the statement succeeds, whatever the
//!   affected row count, and its outcome never changes the result.

use super::address::{AddressMatcher, Route};
use super::cursor::BroadcastCursor;
use super::selection::{compose_where, Selection};
use super::{ProviderError, ProviderResult};
use crate::db::migrations::latest_version;
use crate::model::broadcast::{
    is_known_column, BroadcastId, COLUMN_ID, COLUMN_ID_ALIAS, KNOWN_COLUMNS, TABLE_NAME,
};
use crate::model::values::FieldValues;
use crate::notify::ChangeNotifier;
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::Arc;
use std::time::Instant;

/// Read request: projection, filter and ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Requested columns; empty selects every known column.
    pub projection: Vec<String>,
    pub selection: Selection,
    /// Raw `ORDER BY` body, e.g. `timestamp DESC`.
    pub sort_order: Option<String>,
    /// Maximum rows to return; bound as a parameter.
    pub limit: Option<u32>,
}

impl QueryRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_projection<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_sort_order(mut self, sort_order: impl Into<String>) -> Self {
        self.sort_order = Some(sort_order.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Address-keyed data verbs over broadcast rows.
pub trait BroadcastProvider {
    fn collection_address(&self) -> String;
    fn item_address(&self, id: BroadcastId) -> String;

    fn query(&self, address: &str, request: &QueryRequest) -> ProviderResult<BroadcastCursor>;
    /// Returns `broadcasts/<id>` for the new row.
    fn insert(&self, address: &str, values: &FieldValues) -> ProviderResult<String>;
    fn update(
        &self,
        address: &str,
        values: &FieldValues,
        selection: &Selection,
    ) -> ProviderResult<usize>;
    fn delete(&self, address: &str, selection: &Selection) -> ProviderResult<usize>;
}

/// SQLite-backed broadcast provider over a borrowed, migrated connection.
pub struct SqliteBroadcastProvider<'conn> {
    conn: &'conn Connection,
    router: AddressMatcher,
    notifier: Arc<dyn ChangeNotifier>,
}

impl<'conn> SqliteBroadcastProvider<'conn> {
    /// Constructs a provider, failing fast when the store is not ready.
    pub fn try_new(
        conn: &'conn Connection,
        notifier: Arc<dyn ChangeNotifier>,
        authority: &str,
    ) -> ProviderResult<Self> {
        let router = AddressMatcher::new(authority)?;
        ensure_connection_ready(conn)?;
        info!(
            "event=provider_init module=provider status=ok authority={}",
            router.authority()
        );
        Ok(Self {
            conn,
            router,
            notifier,
        })
    }

    pub fn router(&self) -> &AddressMatcher {
        &self.router
    }

    fn publish(&self, route: Route) {
        let address = self.router.canonical_address(route);
        let outcome = self.notifier.notify_change(&address);
        debug!(
            "event=provider_notify module=provider status=ok route={} delivered={}",
            route_kind(route),
            outcome.delivered
        );
    }
}

impl BroadcastProvider for SqliteBroadcastProvider<'_> {
    fn collection_address(&self) -> String {
        self.router.collection_address()
    }

    fn item_address(&self, id: BroadcastId) -> String {
        self.router.item_address(id)
    }

    fn query(&self, address: &str, request: &QueryRequest) -> ProviderResult<BroadcastCursor> {
        let started_at = Instant::now();
        let columns_sql = projection_sql(&request.projection)?;
        let route = self.router.resolve(address)?;
        let mut filter = compose_where(route, &request.selection)?;

        let mut sql = format!("SELECT {columns_sql} FROM {TABLE_NAME}{}", filter.sql);
        if let Some(order) = request
            .sort_order
            .as_deref()
            .map(str::trim)
            .filter(|order| !order.is_empty())
        {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = request.limit {
            sql.push_str(" LIMIT ?");
            filter.binds.push(Value::Integer(i64::from(limit)));
        }

        let result = read_rows(self.conn, &sql, filter.binds);
        let cursor = log_store_call("query", route, started_at, result)?;

        Ok(cursor.watch(
            Arc::clone(&self.notifier),
            self.router.canonical_address(route),
        ))
    }

    fn insert(&self, address: &str, values: &FieldValues) -> ProviderResult<String> {
        let started_at = Instant::now();
        let route = self.router.resolve(address)?;
        if route != Route::Collection {
            return Err(ProviderError::UnrecognizedAddress(address.to_string()));
        }

        let result = insert_row(self.conn, values);
        let id = log_store_call("insert", route, started_at, result)?;

        self.publish(route);
        Ok(format!("{TABLE_NAME}/{id}"))
    }

    fn update(
        &self,
        address: &str,
        values: &FieldValues,
        selection: &Selection,
    ) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let route = self.router.resolve(address)?;
        if values.is_empty() {
            return Err(ProviderError::EmptyValues);
        }

        let filter = compose_where(route, selection)?;
        let assignments = values
            .iter()
            .map(|(column, _)| format!("{} = ?", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {TABLE_NAME} SET {assignments}{}", filter.sql);

        let mut binds: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
        binds.extend(filter.binds);

        let result = self
            .conn
            .execute(&sql, params_from_iter(binds))
            .map_err(ProviderError::from);
        let changed = log_store_call("update", route, started_at, result)?;

        self.publish(route);
        Ok(changed)
    }

    fn delete(&self, address: &str, selection: &Selection) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let route = self.router.resolve(address)?;
        let filter = compose_where(route, selection)?;
        let sql = format!("DELETE FROM {TABLE_NAME}{}", filter.sql);

        let result = self
            .conn
            .execute(&sql, params_from_iter(filter.binds))
            .map_err(ProviderError::from);
        let removed = log_store_call("delete", route, started_at, result)?;

        self.publish(route);
        Ok(removed)
    }
}

fn projection_sql(projection: &[String]) -> ProviderResult<String> {
    if projection.is_empty() {
        return Ok(KNOWN_COLUMNS.join(", "));
    }

    let mut columns = Vec::with_capacity(projection.len());
    for name in projection {
        if !is_known_column(name) {
            return Err(ProviderError::UnknownColumn(name.clone()));
        }
        if name == COLUMN_ID_ALIAS {
            columns.push(format!("{COLUMN_ID} AS {COLUMN_ID_ALIAS}"));
        } else {
            columns.push(name.clone());
        }
    }
    Ok(columns.join(", "))
}

fn read_rows(conn: &Connection, sql: &str, binds: Vec<Value>) -> ProviderResult<BroadcastCursor> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            values.push(row.get::<_, Value>(index)?);
        }
        collected.push(values);
    }

    Ok(BroadcastCursor::new(columns, collected))
}

fn insert_row(conn: &Connection, values: &FieldValues) -> ProviderResult<BroadcastId> {
    if values.is_empty() {
        conn.execute(&format!("INSERT INTO {TABLE_NAME} DEFAULT VALUES"), [])?;
    } else {
        let columns = values
            .iter()
            .map(|(column, _)| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; values.len()].join(", ");
        conn.execute(
            &format!("INSERT INTO {TABLE_NAME} ({columns}) VALUES ({placeholders})"),
            params_from_iter(values.iter().map(|(_, value)| value)),
        )?;
    }
    Ok(conn.last_insert_rowid())
}

fn log_store_call<T: StoreOutcome>(
    operation: &'static str,
    route: Route,
    started_at: Instant,
    result: ProviderResult<T>,
) -> ProviderResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(value) => debug!(
            "event=provider_{operation} module=provider status=ok route={} {}={} duration_ms={duration_ms}",
            route_kind(route),
            T::METRIC,
            value.metric()
        ),
        Err(err) => warn!(
            "event=provider_{operation} module=provider status=error route={} duration_ms={duration_ms} error={err}",
            route_kind(route)
        ),
    }
    result
}

/// Per-operation number reported in provider logs.
trait StoreOutcome {
    const METRIC: &'static str;
    fn metric(&self) -> i64;
}

impl StoreOutcome for usize {
    const METRIC: &'static str = "rows";
    fn metric(&self) -> i64 {
        i64::try_from(*self).unwrap_or(i64::MAX)
    }
}

impl StoreOutcome for BroadcastId {
    const METRIC: &'static str = "id";
    fn metric(&self) -> i64 {
        *self
    }
}

impl StoreOutcome for BroadcastCursor {
    const METRIC: &'static str = "rows";
    fn metric(&self) -> i64 {
        i64::try_from(self.len()).unwrap_or(i64::MAX)
    }
}

fn route_kind(route: Route) -> &'static str {
    match route {
        Route::Collection => "collection",
        Route::Item(_) => "item",
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ensure_connection_ready(conn: &Connection) -> ProviderResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ProviderError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, TABLE_NAME)? {
        return Err(ProviderError::MissingRequiredTable(TABLE_NAME));
    }

    for column in KNOWN_COLUMNS {
        if !table_has_column(conn, TABLE_NAME, column)? {
            return Err(ProviderError::MissingRequiredColumn {
                table: TABLE_NAME,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> ProviderResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> ProviderResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{projection_sql, quote_identifier};
    use crate::provider::ProviderError;

    #[test]
    fn empty_projection_selects_known_columns_in_table_order() {
        assert_eq!(
            projection_sql(&[]).unwrap(),
            "_id, action, extras, timestamp, uploaded"
        );
    }

    #[test]
    fn id_alias_is_rewritten() {
        let projection = vec!["id".to_string(), "action".to_string()];
        assert_eq!(projection_sql(&projection).unwrap(), "_id AS id, action");
    }

    #[test]
    fn unknown_projection_column_is_rejected() {
        let projection = vec!["action".to_string(), "payload; DROP TABLE x".to_string()];
        let err = projection_sql(&projection).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownColumn(ref name) if name == "payload; DROP TABLE x"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("uploaded"), "\"uploaded\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
