use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{db::init_db, error::Result};

/// Owns the write path to the dispatches table.
///
/// Thread-safe: wraps its SQLite connection in a Mutex so the store can sit
/// behind an Arc in shared gateway state.
pub struct DispatchStore {
    conn: Mutex<Connection>,
}

impl DispatchStore {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Atomically claim the (user, slot) pair.
    ///
    /// Returns `Ok(true)` when the reservation was acquired and the caller
    /// should proceed to send, `Ok(false)` when a record already exists
    /// (normal "already sent" signal, skip silently). `Err` means the store
    /// itself failed; callers must treat that as "not reserved".
    ///
    /// There is deliberately no release/rollback: delivery failures after a
    /// successful reserve stand as sent, because a rare missed email is
    /// cheaper than a duplicate one.
    pub fn reserve(&self, user_id: i64, slot_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT INTO dispatches (user_id, slot_id, sent_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, slot_id) DO NOTHING",
            rusqlite::params![user_id, slot_id, now.to_rfc3339()],
        )?;

        if inserted == 1 {
            tracing::debug!(user_id, slot_id, "dispatch slot reserved");
            Ok(true)
        } else {
            tracing::debug!(user_id, slot_id, "dispatch slot already taken");
            Ok(false)
        }
    }

    /// All slot ids ever dispatched to `user_id`. Feeds the classifier.
    pub fn sent_slots(&self, user_id: i64) -> Result<HashSet<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT slot_id FROM dispatches WHERE user_id = ?1")?;
        let slots = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(slots)
    }

    /// Total number of dispatch records. Used by the health endpoint.
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n: u64 = conn.query_row("SELECT COUNT(*) FROM dispatches", [], |row| row.get(0))?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DispatchStore {
        DispatchStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn first_reserve_wins_second_is_refused() {
        let s = store();
        let now = Utc::now();
        assert!(s.reserve(10, "onboarding_day_1", now).unwrap());
        assert!(!s.reserve(10, "onboarding_day_1", now).unwrap());
    }

    #[test]
    fn different_slots_and_users_do_not_conflict() {
        let s = store();
        let now = Utc::now();
        assert!(s.reserve(10, "onboarding_day_1", now).unwrap());
        assert!(s.reserve(10, "onboarding_day_3", now).unwrap());
        assert!(s.reserve(11, "onboarding_day_1", now).unwrap());
        assert_eq!(s.count().unwrap(), 3);
    }

    #[test]
    fn sent_slots_reflect_reservations() {
        let s = store();
        let now = Utc::now();
        s.reserve(10, "onboarding_day_1", now).unwrap();
        s.reserve(10, "dormancy_cycle_1", now).unwrap();

        let slots = s.sent_slots(10).unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots.contains("onboarding_day_1"));
        assert!(slots.contains("dormancy_cycle_1"));
        assert!(s.sent_slots(11).unwrap().is_empty());
    }
}
