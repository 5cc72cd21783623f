//! Generic entity repository over SQLite.
//! Entity types describe their table and key; the repository does the rest.

pub mod config;
pub mod db;
pub mod executor;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LogConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use executor::{Bind, Filter, QueryExecutor, SelectQuery, SqliteExecutor, TableNaming};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{DeleteTarget, Descriptor, Entity, Payload, PrimaryKey};
pub use model::record::{record, text, Record, Value};
pub use repo::entity_repo::{EntityRepository, SetQuery, SqliteEntityRepository};
pub use repo::{RepoError, RepoResult};
pub use schema::{ColumnSpec, ColumnType, SchemaAccessor, TableSpec};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
