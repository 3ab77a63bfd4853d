//! Unit tests for the SmartMark database layer (connection + schema setup).

use smartmark::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use smartmark::database::Database;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_schema_creates_bookmarks_table_and_index() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    let count = |kind: &str, name: &str| -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type=?1 AND name=?2",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap_or(false)
    };

    assert!(count("table", "bookmarks"), "bookmarks table should exist");
    assert!(count("table", "schema_version"), "schema_version table should exist");
    assert!(
        count("index", "idx_bookmarks_owner_created"),
        "owner/created index should exist"
    );
}

#[test]
fn test_schema_version_recorded() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(&db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    assert!(run_all(&conn).is_ok(), "running schema setup twice should succeed");
    assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_open_file_database_creates_parent_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("smartmark.db");

    let db = Database::open(&db_path);
    assert!(db.is_ok(), "open with file path should succeed");
    assert!(db_path.exists(), "database file should exist on disk");
}

#[test]
fn test_file_database_persists_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("smartmark.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO bookmarks (id, url, title, tags, user_id, created_at)
                 VALUES ('b1', 'https://example.com', 'Example', '[\"a\"]', 'u1', 1700000000000000)",
                [],
            )
            .unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    let (url, tags): (String, String) = db
        .connection()
        .query_row("SELECT url, tags FROM bookmarks WHERE id = 'b1'", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(url, "https://example.com");
    assert_eq!(tags, "[\"a\"]");
}

#[test]
fn test_tags_default_to_empty_array() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    conn.execute(
        "INSERT INTO bookmarks (id, url, title, user_id, created_at) VALUES ('b1', 'https://x.io', '', 'u', 1)",
        [],
    )
    .unwrap();
    let tags: String = conn
        .query_row("SELECT tags FROM bookmarks WHERE id = 'b1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tags, "[]");
}

#[test]
fn test_open_fails_cleanly_when_parent_is_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "x").unwrap();

    let result = Database::open(blocker.join("nested").join("smartmark.db"));
    assert!(result.is_err(), "open under a regular file should fail");
}
