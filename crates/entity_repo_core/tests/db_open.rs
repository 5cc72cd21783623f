use entity_repo_core::model::record::take_text;
use entity_repo_core::{
    open_db, open_db_in_memory, open_db_with_config, record, text, ColumnType, CoreConfig,
    DatabaseConfig, Entity, Record, RepoResult, SchemaAccessor, SqliteEntityRepository,
    SqliteExecutor, TableSpec,
};
use rusqlite::Connection;
use tempfile::tempdir;

#[derive(Debug, PartialEq)]
struct Setting {
    key: String,
    value: String,
}

impl Entity for Setting {
    const TABLE: &'static str = "setting";
    const PRIMARY_KEY: &'static [&'static str] = &["key"];

    fn from_record(mut record: Record) -> RepoResult<Self> {
        Ok(Self {
            key: take_text(&mut record, "key")?,
            value: take_text(&mut record, "value")?,
        })
    }

    fn to_record(&self) -> Record {
        record([
            ("key", text(self.key.as_str())),
            ("value", text(self.value.as_str())),
        ])
    }
}

fn pragma_i64(conn: &Connection, pragma: &str) -> i64 {
    conn.query_row(&format!("PRAGMA {pragma};"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn foreign_keys_follow_config() {
    let on = open_db_in_memory(&DatabaseConfig::default()).unwrap();
    assert_eq!(pragma_i64(&on, "foreign_keys"), 1);

    let off = open_db_in_memory(&DatabaseConfig {
        foreign_keys: false,
        ..DatabaseConfig::default()
    })
    .unwrap();
    assert_eq!(pragma_i64(&off, "foreign_keys"), 0);
}

#[test]
fn busy_timeout_follows_config() {
    let conn = open_db_in_memory(&DatabaseConfig {
        busy_timeout_ms: 1_234,
        ..DatabaseConfig::default()
    })
    .unwrap();
    assert_eq!(pragma_i64(&conn, "busy_timeout"), 1_234);
}

#[test]
fn file_database_persists_across_connections() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.sqlite3");
    let config = DatabaseConfig::default();

    {
        let conn = open_db(&path, &config).unwrap();
        let executor = SqliteExecutor::new(&conn);
        executor
            .create_table(
                &TableSpec::new("setting")
                    .column("key", ColumnType::Text)
                    .column("value", ColumnType::Text)
                    .primary_key(&["key"]),
            )
            .unwrap();
        let repo = SqliteEntityRepository::<Setting>::try_new(&executor, &executor).unwrap();
        repo.create(&Setting {
            key: "theme".to_string(),
            value: "dark".to_string(),
        })
        .unwrap();
    }

    let conn = open_db(&path, &config).unwrap();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Setting>::try_new(&executor, &executor).unwrap();

    assert_eq!(
        repo.get_one("theme").unwrap(),
        Some(Setting {
            key: "theme".to_string(),
            value: "dark".to_string(),
        })
    );
    assert_eq!(repo.delete_one("theme").unwrap(), 1);
    assert!(repo.get_one("theme").unwrap().is_none());
}

#[test]
fn config_path_selects_file_or_memory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("configured.sqlite3");

    let json = format!(
        r#"{{ "database": {{ "path": {} }}, "table_prefix": "cfg_" }}"#,
        serde_json::to_string(&path).unwrap()
    );
    let config = CoreConfig::from_json_str(&json).unwrap();

    {
        let conn = open_db_with_config(&config.database).unwrap();
        let executor = SqliteExecutor::with_naming(&conn, config.table_naming().unwrap());
        executor
            .create_table(&TableSpec::new("marker").column("name", ColumnType::Text))
            .unwrap();
    }
    assert!(path.exists());

    let reopened = open_db_with_config(&config.database).unwrap();
    assert!(SqliteExecutor::new(&reopened).table_exists("cfg_marker").unwrap());

    let memory = open_db_with_config(&DatabaseConfig::default()).unwrap();
    assert!(!SqliteExecutor::new(&memory).table_exists("cfg_marker").unwrap());
}

#[test]
fn open_db_fails_for_unreachable_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("nested").join("db.sqlite3");

    assert!(open_db(&path, &DatabaseConfig::default()).is_err());
}
