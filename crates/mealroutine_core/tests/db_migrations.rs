use mealroutine_core::db::migrations::latest_version;
use mealroutine_core::db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
use mealroutine_core::{DatabaseConfig, RepoError, SqliteRoutineRepository};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "meal_routines");
    assert_table_exists(&conn, "daily_meals");
    assert_table_exists(&conn, "meals");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mealroutine.sqlite3");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "meals");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(!err.is_busy());
    assert!(err.to_string().contains("schema version 999"));
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn options_from_config_carry_busy_timeout() {
    let config = DatabaseConfig {
        path: None,
        busy_timeout_ms: 250,
    };
    let options = DbOptions::from(&config);
    assert_eq!(options.busy_timeout, Duration::from_millis(250));

    let dir = tempfile::tempdir().unwrap();
    let conn = open_db_with_options(dir.path().join("timeout.sqlite3"), options).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = SqliteRoutineRepository::try_new(&mut conn)
        .err()
        .expect("unmigrated connection must be rejected");
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn schema_rejects_slot_with_recipe_awaiting_selection() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO meal_routines (id, creator_id, meal_routine_state, start_date, end_date, created_at)
         VALUES ('r1', 'u1', 'SELECTING_MEALS', 0, 10, 0);
         INSERT INTO daily_meals (id, routine_id, date, day) VALUES ('d1', 'r1', 0, 'Monday');",
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO meals (id, daily_meal_id, meal_type, meal_state, recipe_id)
         VALUES ('m1', 'd1', 'LUNCH', 'PENDING_MEAL_SELECTION', 'recipe-a');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn schema_rejects_two_days_with_the_same_date() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO meal_routines (id, creator_id, meal_routine_state, start_date, end_date, created_at)
         VALUES ('r1', 'u1', 'SELECTING_DATE_RANGE', 0, 10, 0);
         INSERT INTO daily_meals (id, routine_id, date, day) VALUES ('d1', 'r1', 0, 'Monday');",
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO daily_meals (id, routine_id, date, day) VALUES ('d2', 'r1', 0, 'Monday');",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
