use entity_repo_core::model::record::{take_i64, take_text};
use entity_repo_core::{
    open_db_in_memory, record, text, Bind, ColumnType, DatabaseConfig, DbError, Entity, Filter,
    Payload, QueryExecutor, Record, RepoError, RepoResult, SchemaAccessor, SetQuery,
    SqliteEntityRepository, SqliteExecutor, TableSpec, Value,
};
use rusqlite::Connection;

#[derive(Debug, Clone, PartialEq)]
struct Book {
    id: i64,
    title: String,
    year: i64,
}

impl Entity for Book {
    const TABLE: &'static str = "book";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn from_record(mut record: Record) -> RepoResult<Self> {
        Ok(Self {
            id: take_i64(&mut record, "id")?,
            title: take_text(&mut record, "title")?,
            year: take_i64(&mut record, "year")?,
        })
    }

    fn to_record(&self) -> Record {
        record([
            ("id", Value::Integer(self.id)),
            ("title", text(self.title.as_str())),
            ("year", Value::Integer(self.year)),
        ])
    }
}

fn setup() -> Connection {
    let conn = open_db_in_memory(&DatabaseConfig::default()).unwrap();
    {
        let executor = SqliteExecutor::new(&conn);
        executor
            .create_table(
                &TableSpec::new("book")
                    .column("id", ColumnType::Integer)
                    .column("title", ColumnType::Text)
                    .column("year", ColumnType::Integer)
                    .primary_key(&["id"]),
            )
            .unwrap();

        let repo = SqliteEntityRepository::<Book>::new(&executor, &executor).unwrap();
        for (id, title, year) in [
            (1, "Dune", 1965),
            (2, "Neuromancer", 1984),
            (3, "Hyperion", 1989),
            (4, "Foundation", 1951),
            (5, "Solaris", 1961),
        ] {
            let book = Book {
                id,
                title: title.to_string(),
                year,
            };
            assert_eq!(repo.create(&book).unwrap(), Some(id));
        }
    }
    conn
}

fn titles(books: &[Book]) -> Vec<&str> {
    books.iter().map(|book| book.title.as_str()).collect()
}

#[test]
fn get_set_without_refinements_returns_all_rows() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let all = repo.get_set(&SetQuery::new().with_order("id ASC")).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].title, "Dune");
}

#[test]
fn get_set_binds_named_and_positional_parameters() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let named = SetQuery::new()
        .with_filter(Filter::clause("year >= :from").bind("from", Value::Integer(1980)))
        .with_order("year ASC");
    assert_eq!(
        titles(&repo.get_set(&named).unwrap()),
        ["Neuromancer", "Hyperion"]
    );

    let positional = SetQuery::new()
        .with_filter(
            Filter::clause("year < ?")
                .and("title LIKE ?")
                .bind_positional(Value::Integer(1970))
                .bind_positional(text("%o%")),
        )
        .with_order("title DESC");
    assert_eq!(
        titles(&repo.get_set(&positional).unwrap()),
        ["Solaris", "Foundation"]
    );
}

#[test]
fn get_set_applies_limit_and_offset() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let page = SetQuery::new().with_order("year ASC").with_limit(2, Some(1));
    assert_eq!(
        titles(&repo.get_set(&page).unwrap()),
        ["Solaris", "Dune"]
    );

    let first = SetQuery::new().with_order("year DESC").with_limit(1, None);
    assert_eq!(titles(&repo.get_set(&first).unwrap()), ["Hyperion"]);

    // Offset without a limit is ignored.
    let mut offset_only = SetQuery::new().with_order("id ASC");
    offset_only.offset = Some(3);
    assert_eq!(repo.get_set(&offset_only).unwrap().len(), 5);
}

#[test]
fn get_set_with_no_match_is_empty() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let query = SetQuery::new()
        .with_filter(Filter::clause("title = :title").bind("title", text("Ubik")));
    assert!(repo.get_set(&query).unwrap().is_empty());
}

#[test]
fn unbound_or_surplus_parameters_fail_the_call() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let missing = SetQuery::new().with_filter(Filter::clause("year = :year"));
    assert!(matches!(
        repo.get_set(&missing),
        Err(RepoError::Db(DbError::Sqlite(_)))
    ));

    let surplus = SetQuery::new().with_filter(
        Filter::clause("year = ?")
            .bind_positional(Value::Integer(1965))
            .bind_positional(Value::Integer(1984)),
    );
    assert!(matches!(
        repo.get_set(&surplus),
        Err(RepoError::Db(DbError::Sqlite(_)))
    ));

    let unused_name = SetQuery::new().with_filter(
        Filter::clause("year = ?")
            .bind_positional(Value::Integer(1965))
            .bind("unused", Value::Integer(1)),
    );
    assert!(repo.get_set(&unused_name).is_err());
}

#[test]
fn numbered_placeholders_in_update_set_are_rejected_without_mutation() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let data = record([("title", text("NEW"))]);
    let filter = Filter::clause("year > ?1").bind_positional(Value::Integer(1980));
    let err = repo.update_set(&data, &filter).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Db(DbError::InvalidStatement(ref message)) if message.contains("`?1`")
    ));

    let renamed = repo
        .get_set(&SetQuery::new().with_filter(Filter::clause("title = 'NEW'")))
        .unwrap();
    assert!(renamed.is_empty());

    // The same predicate with an unnumbered slot updates the matching rows.
    let filter = Filter::clause("year > ?").bind_positional(Value::Integer(1980));
    assert_eq!(repo.update_set(&data, &filter).unwrap(), 2);
}

#[test]
fn numbered_placeholders_in_get_set_and_delete_set_are_rejected() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let gapped = SetQuery::new()
        .with_filter(Filter::clause("year > ?2").bind_positional(Value::Integer(1980)));
    assert!(matches!(
        repo.get_set(&gapped),
        Err(RepoError::Db(DbError::InvalidStatement(_)))
    ));

    let first = SetQuery::new()
        .with_filter(Filter::clause("year > ?1").bind_positional(Value::Integer(1980)));
    assert!(matches!(
        repo.get_set(&first),
        Err(RepoError::Db(DbError::InvalidStatement(_)))
    ));

    let delete = Filter::clause("year < ?1").bind_positional(Value::Integer(1962));
    assert!(matches!(
        repo.delete_set(&delete),
        Err(RepoError::Db(DbError::InvalidStatement(_)))
    ));
    assert_eq!(repo.get_set(&SetQuery::new()).unwrap().len(), 5);

    // Question marks inside literals are plain text.
    let literal = SetQuery::new().with_filter(Filter::clause("title <> 'Who?1'"));
    assert_eq!(repo.get_set(&literal).unwrap().len(), 5);
}

#[test]
fn delete_set_removes_matching_rows_only() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let old = Filter::clause("year < :cutoff").bind("cutoff", Value::Integer(1962));
    assert_eq!(repo.delete_set(&old).unwrap(), 2);

    let remaining = repo
        .get_set(&SetQuery::new().with_order("id ASC"))
        .unwrap();
    assert_eq!(titles(&remaining), ["Dune", "Neuromancer", "Hyperion"]);

    assert!(matches!(
        repo.delete_set(&Filter::new()),
        Err(RepoError::UnboundedBulkMutation { .. })
    ));
    assert_eq!(repo.get_set(&SetQuery::new()).unwrap().len(), 3);
}

#[test]
fn update_set_assigns_non_key_fields_on_matches() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);
    let repo = SqliteEntityRepository::<Book>::try_new(&executor, &executor).unwrap();

    let data = record([("id", Value::Integer(100)), ("year", Value::Integer(2000))]);
    let filter = Filter::clause("year > ?").bind_positional(Value::Integer(1980));
    assert_eq!(repo.update_set(Payload::Record(&data), &filter).unwrap(), 2);

    let moved = repo
        .get_set(
            &SetQuery::new()
                .with_filter(Filter::clause("year = 2000"))
                .with_order("id ASC"),
        )
        .unwrap();
    assert_eq!(
        moved.iter().map(|book| book.id).collect::<Vec<_>>(),
        [2, 3]
    );
}

#[test]
fn executor_select_builder_reads_projected_columns() {
    let conn = setup();
    let executor = SqliteExecutor::new(&conn);

    let query = executor
        .select()
        .from(executor.table_name("book"), &["title"])
        .where_clause("id = :id");
    let row = executor
        .fetch_row(&query, &Bind::new().with("id", Value::Integer(3)))
        .unwrap()
        .unwrap();

    assert_eq!(row, record([("title", text("Hyperion"))]));
}
