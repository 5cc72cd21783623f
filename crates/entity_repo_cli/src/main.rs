//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load core config (optional JSON path argument plus environment).
//! - Run one create/get/update/delete cycle through the generic repository.
//! - Keep output deterministic for quick local sanity checks.

use entity_repo_core::model::record::{take_i64, take_text};
use entity_repo_core::{
    core_version, init_logging, open_db_with_config, record, text, ColumnType, CoreConfig, Entity,
    Payload, Record, RepoResult, SchemaAccessor, SqliteEntityRepository, SqliteExecutor,
    TableSpec, Value,
};
use log::{error, info};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

struct ProbeEntry {
    id: Option<i64>,
    label: String,
}

impl Entity for ProbeEntry {
    const TABLE: &'static str = "probe_entry";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn from_record(mut record: Record) -> RepoResult<Self> {
        Ok(Self {
            id: Some(take_i64(&mut record, "id")?),
            label: take_text(&mut record, "label")?,
        })
    }

    fn to_record(&self) -> Record {
        let mut fields = record([("label", text(self.label.as_str()))]);
        if let Some(id) = self.id {
            fields.insert("id".to_string(), Value::Integer(id));
        }
        fields
    }
}

fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    match run(config_path.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("entity_repo probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::load(config_path)?;
    if let Some(dir) = &config.log.dir {
        let dir = if dir.is_absolute() {
            dir.clone()
        } else {
            std::env::current_dir()?.join(dir)
        };
        init_logging(&config.log.level, &dir)?;
    }
    println!("entity_repo_core version={}", core_version());

    let conn = open_db_with_config(&config.database)?;
    let executor = SqliteExecutor::with_naming(&conn, config.table_naming()?);
    executor.create_table(
        &TableSpec::new(ProbeEntry::TABLE)
            .auto_increment_key("id")
            .column("label", ColumnType::Text),
    )?;

    let repo = SqliteEntityRepository::<ProbeEntry>::try_new(&executor, &executor)?;
    let entry = ProbeEntry {
        id: None,
        label: "probe".to_string(),
    };
    let id = repo
        .create(&entry)?
        .ok_or("probe insert reported no row")?;
    println!("created {} id={id}", repo.table_name());

    let loaded = repo.get_one(id)?.ok_or("probe row not found")?;
    println!("loaded id={:?} label={}", loaded.id, loaded.label);

    let relabel = record([("label", text("probe-updated"))]);
    let updated = repo.update_by_pk(Payload::Record(&relabel), Some(id.into()))?;
    println!("updated rows={updated}");

    let deleted = repo.delete_one(id)?;
    println!("deleted rows={deleted}");

    info!("event=cli_probe module=cli status=ok table={}", repo.table_name());
    Ok(())
}
