use rusqlite::Connection;

use crate::error::Result;

/// Initialise the dispatch schema in `conn`.
///
/// The composite primary key is the whole contract: at most one row per
/// (user, slot), enforced by the database rather than by application logic.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS dispatches (
            user_id  INTEGER NOT NULL,
            slot_id  TEXT    NOT NULL,
            sent_at  TEXT    NOT NULL,   -- ISO-8601
            PRIMARY KEY (user_id, slot_id)
        ) STRICT;
        ",
    )?;
    Ok(())
}
