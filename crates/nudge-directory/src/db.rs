use rusqlite::Connection;

use crate::error::Result;

/// Initialise the directory schema in `conn`.
///
/// Safe to call on every startup — CREATE IF NOT EXISTS means it's
/// idempotent. The drip pipeline never writes these tables; the schema lives
/// here so a fresh database is usable before the first ingestion run.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS owners (
            id              INTEGER NOT NULL PRIMARY KEY,
            login           TEXT    NOT NULL,
            installed_at    TEXT    NOT NULL,   -- ISO-8601
            uninstalled_at  TEXT                -- ISO-8601 or NULL while live
        ) STRICT;

        CREATE TABLE IF NOT EXISTS users (
            id        INTEGER NOT NULL PRIMARY KEY,
            login     TEXT    NOT NULL,
            email     TEXT,
            owner_id  INTEGER NOT NULL REFERENCES owners(id)
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_users_owner ON users (owner_id);

        CREATE TABLE IF NOT EXISTS activity (
            owner_id        INTEGER NOT NULL REFERENCES owners(id),
            user_id         INTEGER NOT NULL REFERENCES users(id),
            pull_number     INTEGER NOT NULL,
            created_at      TEXT    NOT NULL,   -- ISO-8601
            is_test_passed  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (owner_id, pull_number)
        ) STRICT;

        -- Hot path: newest activity per owner within the lookback window.
        CREATE INDEX IF NOT EXISTS idx_activity_owner_created
            ON activity (owner_id, created_at);
        ",
    )?;
    Ok(())
}
