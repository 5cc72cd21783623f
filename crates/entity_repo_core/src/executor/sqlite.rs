//! SQLite-backed `QueryExecutor`.
//!
//! # Responsibility
//! - Render INSERT/UPDATE/DELETE/SELECT text and bind every value as a
//!   statement parameter.
//! - Quote identifiers and literals with SQLite escaping rules.
//!
//! # Invariants
//! - Parameters are bound slot by slot: named slots by name, unnamed slots in
//!   order. Missing or surplus values fail the call before execution.
//! - Caller SQL may use `?` or named placeholders only. Numbered `?NNN` slots
//!   are rejected because generated slots would shift their numbering.
//! - Statement outcomes are logged without field values.

use super::{Bind, Filter, QueryExecutor, SelectQuery, TableNaming, RESERVED_PARAM_PREFIX};
use crate::db::{DbError, DbResult};
use crate::model::record::{Record, Value};
use log::{debug, warn};
use rusqlite::{Connection, Row, Statement};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::time::Instant;

/// Executor over a borrowed SQLite connection.
pub struct SqliteExecutor<'conn> {
    conn: &'conn Connection,
    naming: TableNaming,
}

impl<'conn> SqliteExecutor<'conn> {
    /// Executor without a table prefix.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_naming(conn, TableNaming::default())
    }

    pub fn with_naming(conn: &'conn Connection, naming: TableNaming) -> Self {
        Self { conn, naming }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn naming(&self) -> &TableNaming {
        &self.naming
    }

    fn execute(
        &self,
        kind: &'static str,
        table: &str,
        sql: &str,
        bind: &Bind,
    ) -> DbResult<usize> {
        let started_at = Instant::now();
        let result = self
            .prepare_bound(sql, bind)
            .and_then(|mut stmt| stmt.raw_execute().map_err(DbError::from));
        log_outcome(kind, table, started_at, &result, |affected| *affected);
        result
    }

    fn fetch(
        &self,
        query: &SelectQuery,
        bind: &Bind,
        max_rows: Option<usize>,
    ) -> DbResult<Vec<Record>> {
        let started_at = Instant::now();
        let table = query.table().unwrap_or_default().to_string();
        let result = query
            .to_sql(quote_identifier)
            .and_then(|sql| {
                reject_numbered_slots(&sql)?;
                Ok(sql)
            })
            .and_then(|sql| self.collect_rows(&sql, bind, max_rows));
        log_outcome("select", &table, started_at, &result, Vec::len);
        result
    }

    fn collect_rows(
        &self,
        sql: &str,
        bind: &Bind,
        max_rows: Option<usize>,
    ) -> DbResult<Vec<Record>> {
        let mut stmt = self.prepare_bound(sql, bind)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.raw_query();
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_record(row, &columns)?);
            if max_rows.is_some_and(|max| records.len() >= max) {
                break;
            }
        }
        Ok(records)
    }

    fn prepare_bound(&self, sql: &str, bind: &Bind) -> DbResult<Statement<'conn>> {
        let mut stmt = self.conn.prepare(sql)?;
        bind_parameters(&mut stmt, bind)?;
        Ok(stmt)
    }
}

impl QueryExecutor for SqliteExecutor<'_> {
    fn insert(&self, table: &str, values: &Record) -> DbResult<usize> {
        let table_sql = quote_identifier(table);
        let sql = if values.is_empty() {
            format!("INSERT INTO {table_sql} DEFAULT VALUES")
        } else {
            let columns = values
                .keys()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", ");
            let slots = vec!["?"; values.len()].join(", ");
            format!("INSERT INTO {table_sql} ({columns}) VALUES ({slots})")
        };
        let bind = Bind::positional(values.values().cloned().collect());
        self.execute("insert", table, &sql, &bind)
    }

    // SQLite tracks the last rowid per connection, so `table` only labels logs.
    fn last_insert_id(&self, table: &str) -> DbResult<i64> {
        let id = self.conn.last_insert_rowid();
        debug!("event=sql_last_insert_id module=executor status=ok table={table}");
        Ok(id)
    }

    fn update(&self, table: &str, values: &Record, filter: &Filter) -> DbResult<usize> {
        if values.is_empty() {
            return Err(DbError::InvalidStatement(format!(
                "update of `{table}` has no assignments"
            )));
        }
        let conjunction = filter.to_sql();
        if let Some(conjunction) = conjunction.as_deref() {
            reject_numbered_slots(conjunction)?;
        }

        let mut bind = filter.bind.clone();
        let mut sql = format!("UPDATE {} SET ", quote_identifier(table));
        for (index, (column, value)) in values.iter().enumerate() {
            let slot = format!("{RESERVED_PARAM_PREFIX}set_{index}");
            if index > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "{} = :{slot}", quote_identifier(column));
            bind.named.insert(slot, value.clone());
        }
        if let Some(conjunction) = conjunction {
            sql.push_str(" WHERE ");
            sql.push_str(&conjunction);
        }
        self.execute("update", table, &sql, &bind)
    }

    fn delete(&self, table: &str, filter: &Filter) -> DbResult<usize> {
        let mut sql = format!("DELETE FROM {}", quote_identifier(table));
        if let Some(conjunction) = filter.to_sql() {
            reject_numbered_slots(&conjunction)?;
            sql.push_str(" WHERE ");
            sql.push_str(&conjunction);
        }
        self.execute("delete", table, &sql, &filter.bind)
    }

    fn fetch_row(&self, query: &SelectQuery, bind: &Bind) -> DbResult<Option<Record>> {
        Ok(self.fetch(query, bind, Some(1))?.into_iter().next())
    }

    fn fetch_all(&self, query: &SelectQuery, bind: &Bind) -> DbResult<Vec<Record>> {
        self.fetch(query, bind, None)
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name)
    }

    fn quote(&self, value: &Value) -> String {
        quote_literal(value)
    }

    fn table_name(&self, logical: &str) -> String {
        self.naming.resolve(logical)
    }
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders a value as a SQLite literal.
///
/// Non-finite reals have no literal form and render as `NULL`.
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Real(value) if value.is_finite() => format!("{value:?}"),
        Value::Real(_) => "NULL".to_string(),
        Value::Text(value) => format!("'{}'", value.replace('\'', "''")),
        Value::Blob(bytes) => {
            let mut literal = String::with_capacity(bytes.len() * 2 + 3);
            literal.push_str("X'");
            for byte in bytes {
                let _ = write!(literal, "{byte:02X}");
            }
            literal.push('\'');
            literal
        }
    }
}

fn bind_parameters(stmt: &mut Statement<'_>, bind: &Bind) -> DbResult<()> {
    let mut positional = bind.positional.iter();
    let mut positional_used = 0usize;
    let mut named_used = BTreeSet::new();

    for index in 1..=stmt.parameter_count() {
        let slot = stmt.parameter_name(index).map(str::to_string);
        match slot.as_deref().and_then(named_slot) {
            Some(name) => {
                let value = bind.named.get(name).ok_or_else(|| {
                    rusqlite::Error::InvalidParameterName(slot.clone().unwrap_or_default())
                })?;
                stmt.raw_bind_parameter(index, value)?;
                named_used.insert(name.to_string());
            }
            None => {
                let value = positional.next().ok_or(rusqlite::Error::InvalidParameterCount(
                    bind.positional.len(),
                    positional_used + 1,
                ))?;
                stmt.raw_bind_parameter(index, value)?;
                positional_used += 1;
            }
        }
    }

    if positional_used < bind.positional.len() {
        return Err(
            rusqlite::Error::InvalidParameterCount(bind.positional.len(), positional_used).into(),
        );
    }
    if let Some(unused) = bind.named.keys().find(|name| !named_used.contains(*name)) {
        return Err(rusqlite::Error::InvalidParameterName(format!(":{unused}")).into());
    }
    Ok(())
}

/// Fails on a `?NNN` placeholder outside quoted text or identifiers.
///
/// SQLite numbers named slots after the highest index seen so far, so a
/// generated `:__set_0` ahead of a caller's `?1` would share index 1.
fn reject_numbered_slots(sql: &str) -> DbResult<()> {
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (None, '?') => {
                let mut end = start + 1;
                while let Some((index, digit)) = chars.peek().copied() {
                    if !digit.is_ascii_digit() {
                        break;
                    }
                    end = index + 1;
                    chars.next();
                }
                if end > start + 1 {
                    return Err(DbError::InvalidStatement(format!(
                        "numbered placeholder `{}` is not supported; use `?` or a named placeholder",
                        &sql[start..end]
                    )));
                }
            }
            (None, _) => {}
        }
    }
    Ok(())
}

// Unnamed `?` slots report no name; everything else carries its sigil.
fn named_slot(slot: &str) -> Option<&str> {
    match slot.chars().next() {
        Some(':' | '@' | '$') => Some(&slot[1..]),
        _ => None,
    }
}

fn read_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        record.insert(column.clone(), row.get::<_, Value>(index)?);
    }
    Ok(record)
}

fn log_outcome<T>(
    kind: &'static str,
    table: &str,
    started_at: Instant,
    result: &DbResult<T>,
    count: impl Fn(&T) -> usize,
) {
    match result {
        Ok(value) => debug!(
            "event=sql_{} module=executor status=ok table={} rows={} duration_ms={}",
            kind,
            table,
            count(value),
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=sql_{} module=executor status=error table={} duration_ms={} error={}",
            kind,
            table,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}
