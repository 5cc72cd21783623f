//! Generic CRUD repository configured by an `Entity` descriptor.
//!
//! # Responsibility
//! - Normalize primary key arguments and build key predicates.
//! - Dispatch create/read/update/delete to the `QueryExecutor`.
//! - Materialize fetched rows into entity instances.
//!
//! # Invariants
//! - Every public operation issues at most one statement.
//! - Key problems (missing attribute, scalar for composite key) fail before
//!   any statement runs, so they never cause a partial mutation.
//! - Key attributes never appear in an UPDATE assignment list.
//! - All values, key values included, are bound as statement parameters.

use crate::executor::{Filter, QueryExecutor, SqliteExecutor, RESERVED_PARAM_PREFIX};
use crate::model::entity::{DeleteTarget, Descriptor, Entity, Payload, PrimaryKey};
use crate::model::record::{Record, Value};
use crate::repo::{RepoError, RepoResult};
use crate::schema::SchemaAccessor;
use log::debug;
use std::marker::PhantomData;
use std::time::Instant;

/// Repository over a SQLite executor serving both collaborator roles.
pub type SqliteEntityRepository<'x, 'conn, E> =
    EntityRepository<'x, E, SqliteExecutor<'conn>, SqliteExecutor<'conn>>;

/// Refinements for `EntityRepository::get_set`. All parts are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetQuery {
    pub filter: Filter,
    /// Ordering clause such as `name ASC, id DESC`.
    pub order: Option<String>,
    pub limit: Option<u32>,
    /// Only applied together with `limit`.
    pub offset: Option<u32>,
}

impl SetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_limit(mut self, limit: u32, offset: Option<u32>) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// CRUD engine for entity type `E`.
///
/// Holds no mutable state: concurrent use is as safe as the borrowed
/// executor allows.
pub struct EntityRepository<'x, E, Q, S> {
    query: &'x Q,
    schema: &'x S,
    _entity: PhantomData<fn() -> E>,
}

impl<'x, E, Q, S> EntityRepository<'x, E, Q, S>
where
    E: Entity,
    Q: QueryExecutor,
    S: SchemaAccessor,
{
    /// Builds a repository without touching the database.
    ///
    /// # Errors
    /// - `EmptyPrimaryKey` when `E::PRIMARY_KEY` is empty.
    pub fn new(query: &'x Q, schema: &'x S) -> RepoResult<Self> {
        if E::PRIMARY_KEY.is_empty() {
            return Err(RepoError::EmptyPrimaryKey { table: E::TABLE });
        }
        Ok(Self {
            query,
            schema,
            _entity: PhantomData,
        })
    }

    /// Builds a repository after checking the table and its key columns exist.
    ///
    /// # Errors
    /// - `EmptyPrimaryKey`, `MissingRequiredTable`, `MissingRequiredColumn`.
    pub fn try_new(query: &'x Q, schema: &'x S) -> RepoResult<Self> {
        let repo = Self::new(query, schema)?;
        repo.ensure_table_ready()?;
        Ok(repo)
    }

    pub fn descriptor(&self) -> Descriptor {
        E::descriptor()
    }

    /// Physical table name resolved by the query executor.
    pub fn table_name(&self) -> String {
        self.query.table_name(E::TABLE)
    }

    /// Inserts `data` with every field bound as a value.
    ///
    /// Returns the generated row identifier, or `None` when the executor
    /// reports no inserted row. For composite keys the identifier is the
    /// engine rowid and is not checked against the key attributes.
    pub fn create<'p>(&self, data: impl Into<Payload<'p, E>>) -> RepoResult<Option<i64>>
    where
        E: 'p,
    {
        let started_at = Instant::now();
        let payload: Payload<'p, E> = data.into();
        let record = payload.to_record();
        let table = self.table_name();

        let inserted = self.query.insert(&table, &record)?;
        if inserted == 0 {
            log_call("entity_create", &table, started_at, 0);
            return Ok(None);
        }
        let id = self.query.last_insert_id(&table)?;
        log_call("entity_create", &table, started_at, inserted);
        Ok(Some(id))
    }

    /// Fetches the entity addressed by `pk`.
    ///
    /// A scalar binds to the sole key attribute; a mapping is used as-is, one
    /// equality predicate per entry. Only the first matching row is read.
    pub fn get_one(&self, pk: impl Into<PrimaryKey>) -> RepoResult<Option<E>> {
        let started_at = Instant::now();
        let key = self.normalize_key(pk.into())?;
        let table = self.table_name();
        let filter = self.key_filter(&key);

        let select = self.query.select().from(table.as_str(), &["*"]).filter(&filter);
        let found = self.query.fetch_row(&select, &filter.bind)?;
        log_call("entity_get_one", &table, started_at, usize::from(found.is_some()));

        found.map(E::from_record).transpose()
    }

    /// Fetches every entity matching `query`, in storage order unless an
    /// ordering is given. Returns an empty vector when nothing matches.
    pub fn get_set(&self, query: &SetQuery) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        let table = self.table_name();

        let mut select = self
            .query
            .select()
            .from(table.as_str(), &["*"])
            .filter(&query.filter);
        if let Some(order) = query.order.as_deref() {
            select = select.order(order);
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit, query.offset);
        }

        let rows = self.query.fetch_all(&select, &query.filter.bind)?;
        log_call("entity_get_set", &table, started_at, rows.len());
        rows.into_iter().map(E::from_record).collect()
    }

    /// Updates the row addressed by the key attributes found in `data`.
    pub fn update_one<'p>(&self, data: impl Into<Payload<'p, E>>) -> RepoResult<usize>
    where
        E: 'p,
    {
        self.update_by_pk(data, None)
    }

    /// Updates one row with the non-key fields of `data`.
    ///
    /// Without `id` the key is projected from `data`; a mapping `id` is used
    /// as-is; a scalar `id` binds to the sole key attribute. Key attributes in
    /// `data` are dropped from the assignment list either way.
    ///
    /// Returns the affected-row count; `0` when no row matched (or, on some
    /// engines, when nothing changed).
    pub fn update_by_pk<'p>(
        &self,
        data: impl Into<Payload<'p, E>>,
        id: Option<PrimaryKey>,
    ) -> RepoResult<usize>
    where
        E: 'p,
    {
        let started_at = Instant::now();
        let payload: Payload<'p, E> = data.into();
        let record = payload.to_record();
        let key = match id {
            Some(id) => self.normalize_key(id)?,
            None => self.extract_key(&record)?,
        };

        let values = assignments::<E>(&record, &key);
        if values.is_empty() {
            return Err(RepoError::EmptyAssignment { table: E::TABLE });
        }

        let table = self.table_name();
        let updated = self.query.update(&table, &values, &self.key_filter(&key))?;
        log_call("entity_update", &table, started_at, updated);
        Ok(updated)
    }

    /// Deletes the row addressed by `target`.
    ///
    /// Mappings and entities are projected onto the key attributes, so extra
    /// fields are ignored and missing key attributes fail the call.
    pub fn delete_one<'p>(&self, target: impl Into<DeleteTarget<'p, E>>) -> RepoResult<usize>
    where
        E: 'p,
    {
        let started_at = Instant::now();
        let target: DeleteTarget<'p, E> = target.into();
        let key = match target {
            DeleteTarget::Key(PrimaryKey::Composite(mapping)) => self.extract_key(&mapping)?,
            DeleteTarget::Key(scalar) => self.normalize_key(scalar)?,
            DeleteTarget::Entity(entity) => self.extract_key(&entity.to_record())?,
        };

        let table = self.table_name();
        let deleted = self.query.delete(&table, &self.key_filter(&key))?;
        log_call("entity_delete", &table, started_at, deleted);
        Ok(deleted)
    }

    /// Deletes every row matching `filter`.
    ///
    /// # Errors
    /// - `UnboundedBulkMutation` when `filter` has no predicate.
    pub fn delete_set(&self, filter: &Filter) -> RepoResult<usize> {
        if filter.is_empty() {
            return Err(RepoError::UnboundedBulkMutation {
                table: E::TABLE,
                operation: "delete_set",
            });
        }

        let started_at = Instant::now();
        let table = self.table_name();
        let deleted = self.query.delete(&table, filter)?;
        log_call("entity_delete_set", &table, started_at, deleted);
        Ok(deleted)
    }

    /// Assigns the non-key fields of `data` on every row matching `filter`.
    ///
    /// # Errors
    /// - `UnboundedBulkMutation` when `filter` has no predicate.
    /// - `EmptyAssignment` when `data` carries only key attributes.
    pub fn update_set<'p>(
        &self,
        data: impl Into<Payload<'p, E>>,
        filter: &Filter,
    ) -> RepoResult<usize>
    where
        E: 'p,
    {
        if filter.is_empty() {
            return Err(RepoError::UnboundedBulkMutation {
                table: E::TABLE,
                operation: "update_set",
            });
        }

        let started_at = Instant::now();
        let payload: Payload<'p, E> = data.into();
        let values = assignments::<E>(&payload.to_record(), &Record::new());
        if values.is_empty() {
            return Err(RepoError::EmptyAssignment { table: E::TABLE });
        }

        let table = self.table_name();
        let updated = self.query.update(&table, &values, filter)?;
        log_call("entity_update_set", &table, started_at, updated);
        Ok(updated)
    }

    /// Projects `data` onto the primary key attributes.
    ///
    /// # Errors
    /// - `MissingKeyAttribute` naming the first absent or `NULL` attribute.
    pub fn key_of<'p>(&self, data: impl Into<Payload<'p, E>>) -> RepoResult<Record>
    where
        E: 'p,
    {
        let payload: Payload<'p, E> = data.into();
        self.extract_key(&payload.to_record())
    }

    fn normalize_key(&self, pk: PrimaryKey) -> RepoResult<Record> {
        match pk {
            PrimaryKey::Scalar(value) => {
                let descriptor = E::descriptor();
                if descriptor.is_composite() {
                    return Err(RepoError::ScalarKeyForCompositeKey {
                        table: E::TABLE,
                        attributes: descriptor.primary_key.len(),
                    });
                }
                let mut key = Record::new();
                key.insert(descriptor.first_key_attribute().to_string(), value);
                Ok(key)
            }
            PrimaryKey::Composite(mapping) if mapping.is_empty() => {
                Err(RepoError::EmptyKey { table: E::TABLE })
            }
            PrimaryKey::Composite(mapping) => Ok(mapping),
        }
    }

    fn extract_key(&self, data: &Record) -> RepoResult<Record> {
        let mut key = Record::new();
        for attribute in E::PRIMARY_KEY {
            match data.get(*attribute) {
                Some(value) if *value != Value::Null => {
                    key.insert(attribute.to_string(), value.clone());
                }
                _ => {
                    return Err(RepoError::MissingKeyAttribute {
                        table: E::TABLE,
                        attribute: *attribute,
                    });
                }
            }
        }
        Ok(key)
    }

    // Predicates follow declared key order; other mapping entries go last.
    fn key_filter(&self, key: &Record) -> Filter {
        let mut entries: Vec<(&String, &Value)> = key.iter().collect();
        entries.sort_by_key(|(column, _)| {
            E::PRIMARY_KEY
                .iter()
                .position(|attribute| *attribute == column.as_str())
                .unwrap_or(usize::MAX)
        });

        let mut filter = Filter::new();
        for (index, (column, value)) in entries.into_iter().enumerate() {
            let slot = format!("{RESERVED_PARAM_PREFIX}key_{index}");
            filter = filter
                .and(format!("{} = :{slot}", self.query.quote_identifier(column)))
                .bind(slot, value.clone());
        }
        filter
    }

    fn ensure_table_ready(&self) -> RepoResult<()> {
        let table = self.schema.physical_table_name(E::TABLE);
        if !self.schema.table_exists(&table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }

        let columns = self.schema.table_columns(&table)?;
        for attribute in E::PRIMARY_KEY {
            if !columns.iter().any(|column| column == *attribute) {
                return Err(RepoError::MissingRequiredColumn {
                    table,
                    column: *attribute,
                });
            }
        }
        Ok(())
    }
}

/// Fields of `data` that are neither declared key attributes nor in `key`.
fn assignments<E: Entity>(data: &Record, key: &Record) -> Record {
    let descriptor = E::descriptor();
    data.iter()
        .filter(|(column, _)| {
            !descriptor.is_key_attribute(column.as_str()) && !key.contains_key(column.as_str())
        })
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

fn log_call(event: &'static str, table: &str, started_at: Instant, rows: usize) {
    debug!(
        "event={} module=repo status=ok table={} rows={} duration_ms={}",
        event,
        table,
        rows,
        started_at.elapsed().as_millis()
    );
}
