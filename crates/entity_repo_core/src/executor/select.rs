//! SELECT statement builder.
//!
//! # Invariants
//! - Table and column names are quoted at render time by the executor.
//! - `OFFSET` is only rendered together with `LIMIT`.

use super::{render_conjunction, Filter};
use crate::db::{DbError, DbResult};

/// Builder returned by `QueryExecutor::select`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    table: Option<String>,
    columns: Vec<String>,
    predicates: Vec<String>,
    order: Vec<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source table and projected columns; empty or `*` means all.
    pub fn from(mut self, table: impl Into<String>, columns: &[&str]) -> Self {
        self.table = Some(table.into());
        self.columns = columns
            .iter()
            .filter(|column| **column != "*")
            .map(|column| column.to_string())
            .collect();
        self
    }

    /// Adds one predicate fragment; fragments are AND-ed.
    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    /// Adds every predicate of `filter`. Its parameters are bound at fetch time.
    pub fn filter(mut self, filter: &Filter) -> Self {
        self.predicates.extend(filter.predicates.iter().cloned());
        self
    }

    /// Appends an ordering term such as `name ASC`.
    pub fn order(mut self, spec: impl Into<String>) -> Self {
        self.order.push(spec.into());
        self
    }

    pub fn limit(mut self, count: u32, offset: Option<u32>) -> Self {
        self.limit = Some(count);
        self.offset = offset;
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Renders SQL text, quoting table and column names with `quote_identifier`.
    ///
    /// # Errors
    /// Returns `DbError::InvalidStatement` when no table was set.
    pub fn to_sql(&self, quote_identifier: impl Fn(&str) -> String) -> DbResult<String> {
        let table = self.table.as_deref().ok_or_else(|| {
            DbError::InvalidStatement("select query has no source table".to_string())
        })?;

        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {projection} FROM {}", quote_identifier(table));
        if let Some(conjunction) = render_conjunction(&self.predicates) {
            sql.push_str(" WHERE ");
            sql.push_str(&conjunction);
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }
        Ok(sql)
    }
}
