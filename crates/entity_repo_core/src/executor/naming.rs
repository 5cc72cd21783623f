//! Logical to physical table name resolution.

use crate::db::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;

static PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*)?$").expect("table prefix pattern should compile")
});

/// Prefix convention applied to every logical table name.
///
/// Resolution is pure: the same logical name always maps to the same
/// physical name for a given prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNaming {
    prefix: String,
}

impl TableNaming {
    /// # Errors
    /// Returns `DbError::InvalidSchema` unless `prefix` is empty or an
    /// identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn new(prefix: &str) -> DbResult<Self> {
        if !PREFIX_PATTERN.is_match(prefix) {
            return Err(DbError::InvalidSchema(format!(
                "table prefix `{prefix}` must be empty or an identifier"
            )));
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn resolve(&self, logical: &str) -> String {
        format!("{}{logical}", self.prefix)
    }
}
