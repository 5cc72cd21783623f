//! Generic entity repository and its error model.
//!
//! # Responsibility
//! - Provide CRUD over any `Entity` type through the executor seam.
//! - Report key-shape problems as semantic errors before any SQL runs.
//!
//! # Invariants
//! - "Not found" is a sentinel (`None` / `0`), never an error.
//! - Executor failures propagate unchanged inside `RepoError::Db`.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Underlying executor/connection failure.
    Db(DbError),
    /// A primary key attribute is absent (or `NULL`) in the supplied data.
    MissingKeyAttribute {
        table: &'static str,
        attribute: &'static str,
    },
    /// A scalar key was supplied for a multi-attribute primary key.
    ScalarKeyForCompositeKey {
        table: &'static str,
        attributes: usize,
    },
    /// The entity type declares no primary key attributes.
    EmptyPrimaryKey { table: &'static str },
    /// A key mapping without entries was supplied.
    EmptyKey { table: &'static str },
    /// Nothing is left to assign once key attributes are removed.
    EmptyAssignment { table: &'static str },
    /// A bulk mutation was requested without any predicate.
    UnboundedBulkMutation {
        table: &'static str,
        operation: &'static str,
    },
    MissingRequiredTable(String),
    MissingRequiredColumn {
        table: String,
        column: &'static str,
    },
    /// A fetched row cannot be materialized into the entity type.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingKeyAttribute { table, attribute } => write!(
                f,
                "cannot find value for primary key part `{attribute}` of `{table}` in given data"
            ),
            Self::ScalarKeyForCompositeKey { table, attributes } => write!(
                f,
                "`{table}` has a {attributes}-attribute primary key; a scalar key is ambiguous"
            ),
            Self::EmptyPrimaryKey { table } => {
                write!(f, "entity `{table}` declares no primary key attributes")
            }
            Self::EmptyKey { table } => write!(f, "empty key mapping supplied for `{table}`"),
            Self::EmptyAssignment { table } => {
                write!(f, "update of `{table}` has no non-key fields to assign")
            }
            Self::UnboundedBulkMutation { table, operation } => write!(
                f,
                "{operation} on `{table}` requires at least one predicate"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "entity repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "entity repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted entity data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
