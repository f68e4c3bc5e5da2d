use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use nudge_core::types::{ActivityRecord, Owner, User};

use crate::{
    db::init_db,
    error::{DirectoryError, Result},
};

/// Read-only view over the `owners`, `users`, and `activity` tables.
///
/// Thread-safe: wraps its SQLite connection in a Mutex so axum handlers can
/// share one store behind an Arc.
pub struct DirectoryStore {
    conn: Mutex<Connection>,
}

/// Parse an RFC 3339 column value, tagging parse failures with enough
/// context for the caller to log and skip the row.
fn parse_ts(
    table: &'static str,
    column: &'static str,
    id: i64,
    value: &str,
) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DirectoryError::MalformedTimestamp {
            table,
            column,
            id,
            value: value.to_string(),
        })
}

impl DirectoryStore {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All owners whose installation is still live, ordered by id.
    ///
    /// A row with an unparseable `installed_at` is returned as an `Err`
    /// element rather than silently dropped; the pipeline decides whether to
    /// skip it (it does) and logs the reason.
    pub fn active_owners(&self) -> Result<Vec<Result<Owner>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, login, installed_at, uninstalled_at
             FROM owners WHERE uninstalled_at IS NULL ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,            // id
                    row.get::<_, String>(1)?,         // login
                    row.get::<_, String>(2)?,         // installed_at
                    row.get::<_, Option<String>>(3)?, // uninstalled_at
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let owners = rows
            .into_iter()
            .map(|(id, login, installed, uninstalled)| {
                let installed_at = parse_ts("owners", "installed_at", id, &installed)?;
                let uninstalled_at = uninstalled
                    .map(|v| parse_ts("owners", "uninstalled_at", id, &v))
                    .transpose()?;
                Ok(Owner {
                    id,
                    login,
                    installed_at,
                    uninstalled_at,
                })
            })
            .collect();

        Ok(owners)
    }

    /// All users attached to `owner_id`, ordered by user id.
    pub fn users_for_owner(&self, owner_id: i64) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, login, email, owner_id
             FROM users WHERE owner_id = ?1 ORDER BY id",
        )?;

        let users = stmt
            .query_map([owner_id], |row| {
                Ok(User {
                    id: row.get(0)?,
                    login: row.get(1)?,
                    email: row.get(2)?,
                    owner_id: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(users)
    }

    /// Activity records for `owner_id` newer than `since`, newest first.
    ///
    /// Rows with unparseable timestamps are logged and dropped — a single
    /// corrupt ledger row must not hide the rest of the owner's activity.
    pub fn recent_activity(&self, owner_id: i64, since: DateTime<Utc>) -> Result<Vec<ActivityRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT owner_id, user_id, pull_number, created_at, is_test_passed
             FROM activity WHERE owner_id = ?1 AND created_at >= ?2
             ORDER BY created_at DESC",
        )?;

        let rows = stmt
            .query_map(
                rusqlite::params![owner_id, since.to_rfc3339()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,    // owner_id
                        row.get::<_, i64>(1)?,    // user_id
                        row.get::<_, i64>(2)?,    // pull_number
                        row.get::<_, String>(3)?, // created_at
                        row.get::<_, i64>(4)?,    // is_test_passed
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let records = rows
            .into_iter()
            .filter_map(|(owner_id, user_id, pull_number, created, passed)| {
                match parse_ts("activity", "created_at", pull_number, &created) {
                    Ok(created_at) => Some(ActivityRecord {
                        owner_id,
                        user_id,
                        pull_number,
                        created_at,
                        is_test_passed: passed != 0,
                    }),
                    Err(e) => {
                        tracing::warn!(owner_id, pull_number, error = %e, "dropping corrupt activity row");
                        None
                    }
                }
            })
            .collect();

        Ok(records)
    }
}
