//! SQLite connection bootstrap and transport-level errors.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by executors.
//! - Define the error type every executor/schema call surfaces.
//!
//! # Invariants
//! - Connection-level failures are carried unchanged inside `DbError::Sqlite`.
//! - This layer never retries or translates engine errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_config};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Statement could not be composed from the given inputs.
    InvalidStatement(String),
    /// Table definition handed to the schema helper is inconsistent.
    InvalidSchema(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidStatement(message) => write!(f, "invalid statement: {message}"),
            Self::InvalidSchema(message) => write!(f, "invalid table definition: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidStatement(_) => None,
            Self::InvalidSchema(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
