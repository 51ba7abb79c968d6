//! Integration tests for the session gateway against a SQLite database file
//!
//! Every test gets its own database in a temporary directory, so committed data is
//! visible across sessions checked out of the same pool.

#![cfg(feature = "sqlite")]

use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use sessiongate::{AtomicProcessor, Gateway, GatewayError, PoolConfig, Session, Settings, Statement};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    n: i64,
}

type SqliteGateway = Gateway<SqliteConnection>;
type Op = Box<dyn Fn(&mut Session<SqliteConnection>) -> Result<(), GatewayError>>;

/// Test helper to create a gateway on a fresh database with an `items` table
fn setup_gateway() -> (TempDir, SqliteGateway) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("gateway.db");

    let settings = Settings::new(path.display().to_string()).with_pool(PoolConfig {
        max_connections: 2,
        min_idle: 0,
        connection_timeout_secs: 5,
        ..PoolConfig::default()
    });
    let gateway = SqliteGateway::connect(&settings).expect("Failed to connect");

    gateway
        .scoped(|session| session.batch_execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)"))
        .expect("Failed to create table");

    (dir, gateway)
}

fn count_items(gateway: &SqliteGateway) -> i64 {
    gateway
        .scoped(|session| {
            let count = diesel::sql_query("SELECT COUNT(*) AS n FROM items")
                .get_result::<Count>(session.connection()?)?;
            Ok::<_, GatewayError>(count.n)
        })
        .expect("Failed to count items")
}

fn insert(name: &'static str) -> Op {
    Box::new(move |session: &mut Session<SqliteConnection>| {
        session.batch_execute(&format!("INSERT INTO items (name) VALUES ('{}')", name))
    })
}

#[test]
fn test_empty_operations_commit() {
    let (_dir, gateway) = setup_gateway();
    let mut db = gateway.get_db().unwrap();

    let ops: Vec<Statement> = Vec::new();
    let result: Result<bool, GatewayError> = AtomicProcessor::new(&mut *db).process_with_rollback(ops);

    assert!(result.unwrap());
    assert!(!db.in_transaction());
}

#[test]
fn test_committed_operations_visible_to_next_session() {
    let (_dir, gateway) = setup_gateway();

    let applied = gateway
        .process_atomically(vec![insert("alpha"), insert("beta")])
        .unwrap();

    assert!(applied);
    assert_eq!(count_items(&gateway), 2);
}

#[test]
fn test_failing_operation_rolls_back_everything() {
    let (_dir, gateway) = setup_gateway();

    // Duplicate name violates the UNIQUE constraint on the third statement
    let result = gateway.process_atomically::<_, _, GatewayError>(vec![
        Statement::new("INSERT INTO items (name) VALUES ('alpha')"),
        Statement::new("INSERT INTO items (name) VALUES ('beta')"),
        Statement::new("INSERT INTO items (name) VALUES ('alpha')"),
        Statement::new("INSERT INTO items (name) VALUES ('gamma')"),
    ]);

    assert!(matches!(result, Err(GatewayError::Database(_))));
    assert_eq!(count_items(&gateway), 0);
}

#[test]
fn test_operation_error_returned_unchanged() {
    let (_dir, gateway) = setup_gateway();

    let reject: Op = Box::new(|_session: &mut Session<SqliteConnection>| -> Result<(), GatewayError> {
        Err(GatewayError::NoActiveTransaction)
    });
    let ops: Vec<Op> = vec![insert("alpha"), reject];
    let result = gateway.process_atomically(ops);

    assert!(matches!(result, Err(GatewayError::NoActiveTransaction)));
    assert_eq!(count_items(&gateway), 0);
}

#[test]
fn test_scoped_session_rolls_back_uncommitted_work() {
    let (_dir, gateway) = setup_gateway();

    let result: Result<(), GatewayError> = gateway.scoped(|session| {
        session.begin()?;
        session.batch_execute("INSERT INTO items (name) VALUES ('pending')")?;
        session.batch_execute("INSERT INTO missing_table VALUES (1)")?;
        session.commit()
    });

    assert!(result.is_err());
    assert_eq!(count_items(&gateway), 0);
    assert_eq!(gateway.engine().state().idle_connections, gateway.engine().state().connections);
}

#[test]
fn test_get_db_guard_closes_on_early_return() {
    let (_dir, gateway) = setup_gateway();

    fn work(gateway: &SqliteGateway) -> Result<(), GatewayError> {
        let mut db = gateway.get_db()?;
        db.begin()?;
        db.batch_execute("INSERT INTO items (name) VALUES ('pending')")?;
        db.batch_execute("NOT VALID SQL")?;
        db.commit()
    }

    assert!(work(&gateway).is_err());
    assert_eq!(count_items(&gateway), 0);

    let state = gateway.engine().state();
    assert_eq!(state.idle_connections, state.connections);
}

#[test]
fn test_explicit_session_lifecycle() {
    let (_dir, gateway) = setup_gateway();

    let mut session = gateway.sessions().open().unwrap();
    session.begin().unwrap();
    session.batch_execute("INSERT INTO items (name) VALUES ('kept')").unwrap();
    session.commit().unwrap();
    session.close().unwrap();

    assert!(session.is_closed());
    assert_eq!(count_items(&gateway), 1);
    gateway.shutdown();
}
