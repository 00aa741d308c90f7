//! Filter composition for provider statements.
//!
//! Caller filters use anonymous `?` placeholders. Bind order is: command
//! values (update only), then caller arguments, then the item id.
//! Numbered (`?1`) and named (`:x`, `@x`, `$x`) parameters would bind
//! against that combined list, so they are rejected.

use super::address::Route;
use super::{ProviderError, ProviderResult};
use crate::model::broadcast::COLUMN_ID;
use crate::model::values::ColumnValue;
use rusqlite::types::Value;

/// Caller-supplied filter: a SQL predicate plus its bound arguments.
///
/// The predicate may only use anonymous `?` placeholders, consumed in order
/// by `args`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub clause: Option<String>,
    pub args: Vec<Value>,
}

impl Selection {
    /// No filter; matches every row in scope.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter with anonymous `?` placeholders only. Numbered or named
    /// parameters are rejected when the filter is composed.
    pub fn new<I, V>(clause: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ColumnValue>,
    {
        Self {
            clause: Some(clause.into()),
            args: args
                .into_iter()
                .map(|arg| arg.into().into_value())
                .collect(),
        }
    }

    /// Predicate text, with blank clauses treated as absent.
    pub fn predicate(&self) -> Option<&str> {
        self.clause
            .as_deref()
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
    }
}

/// Composed `WHERE` fragment with its binds.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct WhereClause {
    pub sql: String,
    pub binds: Vec<Value>,
}

/// Scopes `selection` to `route`.
///
/// Arguments pass through even when the clause is blank so that a mismatch
/// surfaces as a store error, the same as any other malformed filter.
pub(crate) fn compose_where(route: Route, selection: &Selection) -> ProviderResult<WhereClause> {
    let mut predicates = Vec::with_capacity(2);
    let mut binds = selection.args.clone();

    if let Some(clause) = selection.predicate() {
        if let Some(token) = positional_placeholder(clause) {
            return Err(ProviderError::UnsupportedPlaceholder(token));
        }
        predicates.push(format!("({clause})"));
    }
    if let Route::Item(id) = route {
        predicates.push(format!("{COLUMN_ID} = ?"));
        binds.push(Value::Integer(id));
    }

    let sql = if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    };

    Ok(WhereClause { sql, binds })
}

/// First numbered or named parameter token in `clause`, outside quoted text.
fn positional_placeholder(clause: &str) -> Option<String> {
    let chars: Vec<char> = clause.chars().collect();
    let mut quote: Option<char> = None;
    let mut index = 0;

    while index < chars.len() {
        let current = chars[index];
        if let Some(close) = quote {
            if current == close {
                quote = None;
            }
            index += 1;
            continue;
        }

        match current {
            '\'' | '"' | '`' => quote = Some(current),
            '[' => quote = Some(']'),
            '?' | ':' | '@' | '$' => {
                let token_end = chars[index + 1..]
                    .iter()
                    .position(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
                    .map_or(chars.len(), |offset| index + 1 + offset);
                let is_parameter = match current {
                    '?' => chars[index + 1..token_end]
                        .first()
                        .is_some_and(|c| c.is_ascii_digit()),
                    _ => token_end > index + 1,
                };
                if is_parameter {
                    return Some(chars[index..token_end].iter().collect());
                }
            }
            _ => {}
        }
        index += 1;
    }

    None
}
