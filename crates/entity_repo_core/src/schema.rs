//! Table structure helper: existence checks, column listing and DDL.
//!
//! # Responsibility
//! - Let repositories validate that their table exists with key columns.
//! - Create entity tables from a declarative `TableSpec`.
//!
//! # Invariants
//! - `TableSpec::name` is logical; implementations resolve it the same way
//!   the query executor does.
//! - DDL is idempotent (`CREATE TABLE IF NOT EXISTS`).

use crate::db::{DbError, DbResult};
use crate::executor::{quote_identifier, SqliteExecutor};
use log::info;

/// Schema-level collaborator of the generic repository.
pub trait SchemaAccessor {
    /// Physical name for a logical table name.
    fn physical_table_name(&self, logical: &str) -> String;
    fn table_exists(&self, table: &str) -> DbResult<bool>;
    /// Column names of `table` in declaration order; empty if it does not exist.
    fn table_columns(&self, table: &str) -> DbResult<Vec<String>>;
    fn create_table(&self, spec: &TableSpec) -> DbResult<()>;
}

/// SQLite storage class declared for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Only valid on a sole `INTEGER` primary key column.
    pub auto_increment: bool,
}

/// Declarative table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Adds a `NOT NULL` column.
    pub fn column(self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.push_column(name, column_type, false, false)
    }

    pub fn nullable_column(self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.push_column(name, column_type, true, false)
    }

    /// Adds an `INTEGER PRIMARY KEY AUTOINCREMENT` column and makes it the key.
    pub fn auto_increment_key(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.primary_key = vec![name.clone()];
        self.push_column(name, ColumnType::Integer, false, true)
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|column| column.to_string()).collect();
        self
    }

    fn push_column(
        mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        nullable: bool,
        auto_increment: bool,
    ) -> Self {
        self.columns.push(ColumnSpec {
            name: name.into(),
            column_type,
            nullable,
            auto_increment,
        });
        self
    }

    /// Renders `CREATE TABLE IF NOT EXISTS` for `physical_name`.
    ///
    /// # Errors
    /// Returns `DbError::InvalidSchema` when the definition has no columns,
    /// names an unknown key column, or misuses `auto_increment`.
    pub fn to_sql(&self, physical_name: &str) -> DbResult<String> {
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "table `{}` declares no columns",
                self.name
            )));
        }
        for key in &self.primary_key {
            if !self.columns.iter().any(|column| &column.name == key) {
                return Err(DbError::InvalidSchema(format!(
                    "primary key column `{key}` is not declared in table `{}`",
                    self.name
                )));
            }
        }

        let inline_key = self.inline_auto_increment_key()?;
        let mut definitions = Vec::with_capacity(self.columns.len() + 1);
        for column in &self.columns {
            let mut definition = format!(
                "{} {}",
                quote_identifier(&column.name),
                column.column_type.as_sql()
            );
            if inline_key == Some(column.name.as_str()) {
                definition.push_str(" PRIMARY KEY AUTOINCREMENT");
            } else if !column.nullable {
                definition.push_str(" NOT NULL");
            }
            definitions.push(definition);
        }
        if inline_key.is_none() && !self.primary_key.is_empty() {
            let key_columns = self
                .primary_key
                .iter()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", ");
            definitions.push(format!("PRIMARY KEY ({key_columns})"));
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_identifier(physical_name),
            definitions.join(",\n    ")
        ))
    }

    fn inline_auto_increment_key(&self) -> DbResult<Option<&str>> {
        let mut flagged = self.columns.iter().filter(|column| column.auto_increment);
        let Some(column) = flagged.next() else {
            return Ok(None);
        };
        let sole_integer_key = flagged.next().is_none()
            && column.column_type == ColumnType::Integer
            && self.primary_key.len() == 1
            && self.primary_key[0] == column.name;
        if !sole_integer_key {
            return Err(DbError::InvalidSchema(format!(
                "auto_increment in table `{}` requires a single INTEGER primary key column",
                self.name
            )));
        }
        Ok(Some(column.name.as_str()))
    }
}

impl SchemaAccessor for SqliteExecutor<'_> {
    fn physical_table_name(&self, logical: &str) -> String {
        self.naming().resolve(logical)
    }

    fn table_exists(&self, table: &str) -> DbResult<bool> {
        let exists: i64 = self.connection().query_row(
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

    fn table_columns(&self, table: &str) -> DbResult<Vec<String>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("PRAGMA table_info({});", quote_identifier(table)))?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            columns.push(row.get::<_, String>(1)?);
        }
        Ok(columns)
    }

    fn create_table(&self, spec: &TableSpec) -> DbResult<()> {
        let physical = self.physical_table_name(&spec.name);
        let sql = spec.to_sql(&physical)?;
        self.connection().execute_batch(&sql)?;
        info!(
            "event=schema_create_table module=schema status=ok table={} columns={}",
            physical,
            spec.columns.len()
        );
        Ok(())
    }
}
