//! Statement execution contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define the `QueryExecutor` seam the generic repository depends on.
//! - Carry caller predicates and their bound parameters (`Filter`, `Bind`).
//!
//! # Invariants
//! - Every executor call runs exactly one statement.
//! - Parameter names starting with `__` are reserved for executor/repository
//!   generated placeholders.

mod naming;
mod select;
mod sqlite;

pub use naming::TableNaming;
pub use select::SelectQuery;
pub use sqlite::{quote_identifier, quote_literal, SqliteExecutor};

use crate::db::DbResult;
use crate::model::record::{Record, Value};

/// Prefix for placeholders generated inside this crate.
pub const RESERVED_PARAM_PREFIX: &str = "__";

/// Runs statements, escapes identifiers/values and resolves table names.
///
/// Table arguments are physical names, already passed through `table_name`.
pub trait QueryExecutor {
    /// Inserts one row; returns the affected-row count.
    fn insert(&self, table: &str, values: &Record) -> DbResult<usize>;
    /// Identifier generated by the most recent successful insert.
    fn last_insert_id(&self, table: &str) -> DbResult<i64>;
    /// Assigns `values` on every row matching `filter`.
    fn update(&self, table: &str, values: &Record, filter: &Filter) -> DbResult<usize>;
    /// Deletes every row matching `filter`.
    fn delete(&self, table: &str, filter: &Filter) -> DbResult<usize>;

    fn select(&self) -> SelectQuery {
        SelectQuery::new()
    }

    /// First row produced by `query`, if any.
    fn fetch_row(&self, query: &SelectQuery, bind: &Bind) -> DbResult<Option<Record>>;
    fn fetch_all(&self, query: &SelectQuery, bind: &Bind) -> DbResult<Vec<Record>>;

    fn quote_identifier(&self, name: &str) -> String;
    fn quote(&self, value: &Value) -> String;
    /// Resolves a logical table name through the naming convention.
    fn table_name(&self, logical: &str) -> String;
}

/// Parameter values for placeholders in predicate fragments.
///
/// Named values are keyed without their sigil (`id` binds `:id`, `@id` or
/// `$id`). Positional values fill unnamed `?` slots in statement order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bind {
    pub named: Record,
    pub positional: Vec<Value>,
}

impl Bind {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(values: Record) -> Self {
        Self {
            named: values,
            positional: Vec::new(),
        }
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            named: Record::new(),
            positional: values,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    pub fn push(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

/// Conjunction of predicate fragments in SQLite syntax plus their parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<String>,
    pub bind: Bind,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-fragment filter, e.g. `Filter::clause("name = :name")`.
    pub fn clause(predicate: impl Into<String>) -> Self {
        Self::new().and(predicate)
    }

    pub fn and(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind.named.insert(name.into(), value);
        self
    }

    pub fn bind_positional(mut self, value: Value) -> Self {
        self.bind.positional.push(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// `(p1) AND (p2) ...`, or `None` without predicates.
    pub fn to_sql(&self) -> Option<String> {
        render_conjunction(&self.predicates)
    }
}

pub(crate) fn render_conjunction(predicates: &[String]) -> Option<String> {
    if predicates.is_empty() {
        return None;
    }
    Some(
        predicates
            .iter()
            .map(|predicate| format!("({predicate})"))
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}
