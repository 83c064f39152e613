use mandalart_core::db::migrations::{current_user_version, latest_version};
use mandalart_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "boards");
    assert_table_exists(&conn, "cells");
    assert_table_exists(&conn, "recent_visits");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mandalart.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "cells");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
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
fn foreign_keys_are_enforced_on_open() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn schema_rejects_ninth_slot_and_duplicate_positions() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO boards (board_uuid, owner_uuid, title, root_cell_uuid)
         VALUES ('b', 'o', 'Goals', 'r');
         INSERT INTO cells (cell_uuid, board_uuid, parent_uuid, depth, position, topic)
         VALUES ('r', 'b', NULL, 0, 0, 'Goals');
         INSERT INTO cells (cell_uuid, board_uuid, parent_uuid, depth, position, topic)
         VALUES ('a', 'b', 'r', 1, 0, 'a');",
    )
    .unwrap();

    let out_of_range = conn.execute(
        "INSERT INTO cells (cell_uuid, board_uuid, parent_uuid, depth, position, topic)
         VALUES ('x', 'b', 'r', 1, 8, 'x');",
        [],
    );
    assert!(out_of_range.is_err());

    let duplicate = conn.execute(
        "INSERT INTO cells (cell_uuid, board_uuid, parent_uuid, depth, position, topic)
         VALUES ('y', 'b', 'r', 1, 0, 'y');",
        [],
    );
    assert!(duplicate.is_err());
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
