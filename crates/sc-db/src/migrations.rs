//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use sc_core::{Error, Result};

/// V1: transcoding jobs and their assembled output records.
const V1_INITIAL: &str = r#"
CREATE TABLE jobs (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id      INTEGER,
    width          INTEGER,
    height         INTEGER,
    framerate      REAL,
    bitrate        INTEGER,
    codec          TEXT NOT NULL,
    codec_settings TEXT,
    chunks         INTEGER,
    finished       INTEGER NOT NULL DEFAULT 0,
    assembled_data TEXT,
    created_at     TEXT NOT NULL
);

CREATE INDEX idx_jobs_finished ON jobs(finished);
"#;

/// All migrations in order.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL)];

/// Apply any migrations that have not run yet.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}
