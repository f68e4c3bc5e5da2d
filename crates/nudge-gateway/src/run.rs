//! One complete drip pass: classify → select → reserve → deliver.
//!
//! Stateless between invocations except through the dispatch table, so any
//! partial run (timeout, crash, redeploy mid-pass) is safe to rerun — the
//! reservation gate swallows the overlap.

use chrono::{Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use nudge_notify::{OutboundEmail, SlotContext};
use nudge_policy::{classify, draw_cap, select, Candidate, Slot};

use crate::app::AppState;

/// Outcome counts for one run, returned as the trigger response body.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    /// Users examined across all active owners.
    pub processed: usize,
    /// Users that classified into a lifecycle bucket.
    pub classified: usize,
    /// Cap drawn for this run.
    pub cap: u32,
    /// Candidates kept after ordering and truncation.
    pub selected: usize,
    /// Messages handed to at least one notifier.
    pub sent: usize,
    /// Reservation refused — the slot was already dispatched.
    pub skipped_already_sent: usize,
    /// Persistence could not confirm a reservation; retried next run.
    pub skipped_unavailable: usize,
    /// Directory rows with unusable data, logged and passed over.
    pub skipped_malformed: usize,
    /// Reserved but not delivered; the reservation stands.
    pub delivery_failed: usize,
}

/// A run-level failure, surfaced to the trigger as a 500.
///
/// Per-candidate failures in an otherwise productive run never surface
/// here; they are counted in the summary and the run still returns 200.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("directory unavailable: {0}")]
    Directory(#[from] nudge_directory::DirectoryError),

    /// Dispatch persistence was down for every candidate in the run.
    ///
    /// Partial outages stay a 200 with counts; a run where nothing could be
    /// reserved has done no useful work and must alert the scheduler.
    #[error("dispatch persistence unavailable for all {count} candidates")]
    AllUnavailable { count: usize },
}

/// Execute one full drip pass and return its summary.
pub async fn run_drip(state: &AppState) -> Result<RunSummary, RunError> {
    let now = Utc::now();
    let drip = &state.config.drip;
    let mut summary = RunSummary::default();

    // Run-level: if the directory itself is unreachable there is nothing to
    // do and the caller gets a 500.
    let owners = state.directory.active_owners()?;
    let lookback_start = now - Duration::days(i64::from(drip.activity_lookback_days));

    let mut candidates: Vec<Candidate> = Vec::new();

    for owner_row in owners {
        let owner = match owner_row {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "skipping owner with malformed record");
                summary.skipped_malformed += 1;
                continue;
            }
        };

        let activity = match state.directory.recent_activity(owner.id, lookback_start) {
            Ok(a) => a,
            Err(e) => {
                warn!(owner_id = owner.id, error = %e, "skipping owner: activity query failed");
                summary.skipped_malformed += 1;
                continue;
            }
        };

        let users = match state.directory.users_for_owner(owner.id) {
            Ok(u) => u,
            Err(e) => {
                warn!(owner_id = owner.id, error = %e, "skipping owner: user query failed");
                summary.skipped_malformed += 1;
                continue;
            }
        };

        for user in users {
            summary.processed += 1;

            // Fail closed: if sent-slot state can't be read we assume
            // nothing about it and leave the user for the next run.
            let sent_slots = match state.dispatch.sent_slots(user.id) {
                Ok(s) => s,
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "dispatch history unavailable, skipping user");
                    summary.skipped_unavailable += 1;
                    continue;
                }
            };

            if let Some(c) = classify(&owner, &user, &activity, &sent_slots, drip, now) {
                candidates.push(c);
            }
        }
    }

    summary.classified = candidates.len();
    summary.cap = draw_cap(drip.cap_min, drip.cap_max);

    let picked = select(candidates, summary.cap as usize);
    summary.selected = picked.len();

    let mut reserve_unavailable = 0usize;
    for candidate in picked {
        match state
            .dispatch
            .reserve(candidate.user_id, &candidate.slot.id(), now)
        {
            Ok(true) => match render_and_deliver(state, &candidate).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    // Reservation stands: a rare missed email beats a duplicate.
                    warn!(
                        user_id = candidate.user_id,
                        slot = %candidate.slot,
                        error = %e,
                        "delivery failed after reservation"
                    );
                    summary.delivery_failed += 1;
                }
            },
            Ok(false) => summary.skipped_already_sent += 1,
            Err(e) => {
                warn!(
                    user_id = candidate.user_id,
                    slot = %candidate.slot,
                    error = %e,
                    "reservation unavailable, skipping candidate"
                );
                summary.skipped_unavailable += 1;
                reserve_unavailable += 1;
            }
        }
    }

    // A run where persistence failed closed for every user (or every
    // reservation) sent nothing and must not masquerade as success.
    let dispatch_down_for_everyone =
        summary.processed > 0 && summary.skipped_unavailable == summary.processed;
    let every_reservation_failed = summary.selected > 0 && reserve_unavailable == summary.selected;
    if dispatch_down_for_everyone || every_reservation_failed {
        return Err(RunError::AllUnavailable {
            count: summary.skipped_unavailable,
        });
    }

    Ok(summary)
}

async fn render_and_deliver(state: &AppState, candidate: &Candidate) -> Result<(), String> {
    let (day, cycle) = match candidate.slot {
        Slot::Onboarding { day } => (Some(day), None),
        Slot::Dormancy { cycle } => (None, Some(cycle)),
    };
    let ctx = SlotContext {
        user_login: candidate.user_login.clone(),
        owner_login: candidate.owner_login.clone(),
        day,
        cycle,
    };

    let (subject, body) = state
        .templates
        .render(&candidate.slot.template_key(), &ctx)
        .map_err(|e| e.to_string())?;

    let msg = OutboundEmail {
        recipient: candidate.email.clone(),
        subject,
        body,
    };

    state.notifiers.deliver(&msg).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use rusqlite::Connection;

    use nudge_core::config::NudgeConfig;
    use nudge_directory::DirectoryStore;
    use nudge_dispatch::DispatchStore;
    use nudge_notify::{Notifier, NotifierRegistry, NotifyError, TemplateEngine};

    /// Records every message instead of delivering it.
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<OutboundEmail>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, msg: &OutboundEmail) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(msg.clone());
            if self.fail {
                Err(NotifyError::Http("simulated outage".into()))
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        state: AppState,
        sent: Arc<Mutex<Vec<OutboundEmail>>>,
        db_path: std::path::PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            std::fs::remove_file(&self.db_path).ok();
        }
    }

    fn harness_with(config: NudgeConfig, notifier_fails: bool) -> Harness {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let seq = SEQ.fetch_add(1, Ordering::SeqCst);
        let db_path = std::env::temp_dir().join(format!(
            "nudge-test-{}-{seq}.db",
            std::process::id()
        ));

        let directory = DirectoryStore::new(Connection::open(&db_path).unwrap()).unwrap();
        let dispatch = DispatchStore::new(Connection::open(&db_path).unwrap()).unwrap();

        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut notifiers = NotifierRegistry::new();
        notifiers.register(Box::new(RecordingNotifier {
            sent: sent.clone(),
            fail: notifier_fails,
        }));

        let state = AppState::new(
            config,
            directory,
            dispatch,
            notifiers,
            TemplateEngine::with_defaults().unwrap(),
        );
        Harness {
            state,
            sent,
            db_path,
        }
    }

    fn harness() -> Harness {
        harness_with(NudgeConfig::default(), false)
    }

    fn seed_owner(h: &Harness, id: i64, login: &str, installed_days_ago: i64) {
        let conn = Connection::open(&h.db_path).unwrap();
        let installed = (Utc::now() - Duration::days(installed_days_ago)).to_rfc3339();
        conn.execute(
            "INSERT INTO owners (id, login, installed_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, login, installed],
        )
        .unwrap();
    }

    fn seed_user(h: &Harness, id: i64, owner_id: i64, login: &str, email: Option<&str>) {
        let conn = Connection::open(&h.db_path).unwrap();
        conn.execute(
            "INSERT INTO users (id, login, email, owner_id) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, login, email, owner_id],
        )
        .unwrap();
    }

    fn seed_activity(h: &Harness, owner_id: i64, user_id: i64, pull: i64, days_ago: i64) {
        let conn = Connection::open(&h.db_path).unwrap();
        conn.execute(
            "INSERT INTO activity (owner_id, user_id, pull_number, created_at, is_test_passed)
             VALUES (?1, ?2, ?3, ?4, 1)",
            rusqlite::params![
                owner_id,
                user_id,
                pull,
                (Utc::now() - Duration::days(days_ago)).to_rfc3339()
            ],
        )
        .unwrap();
    }

    // Scenario A: day-1 owner, nothing dispatched — classified, reserved, sent.
    #[tokio::test]
    async fn day_one_user_is_sent_the_welcome_email() {
        let h = harness();
        seed_owner(&h, 1, "acme", 1);
        seed_user(&h, 10, 1, "alice", Some("alice@acme.test"));
        seed_activity(&h, 1, 10, 41, 0);

        let summary = run_drip(&h.state).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.classified, 1);
        assert_eq!(summary.sent, 1);

        let sent = h.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "alice@acme.test");
        assert!(sent[0].subject.contains("alice"));
    }

    // Scenario B / idempotence: running twice back-to-back sends once.
    #[tokio::test]
    async fn second_run_sends_nothing_new() {
        let h = harness();
        seed_owner(&h, 1, "acme", 1);
        seed_user(&h, 10, 1, "alice", Some("alice@acme.test"));
        seed_activity(&h, 1, 10, 41, 0);

        let first = run_drip(&h.state).await.unwrap();
        assert_eq!(first.sent, 1);

        let second = run_drip(&h.state).await.unwrap();
        assert_eq!(second.sent, 0);
        // Already-dispatched slot no longer classifies at all.
        assert_eq!(second.classified, 0);
        assert_eq!(h.sent.lock().unwrap().len(), 1);
    }

    // Scenario C: 8 days idle with a 7-day threshold — dormancy reminder.
    #[tokio::test]
    async fn dormant_owner_gets_a_reminder() {
        let h = harness();
        seed_owner(&h, 1, "acme", 30);
        seed_user(&h, 10, 1, "alice", Some("alice@acme.test"));
        seed_activity(&h, 1, 10, 41, 8);

        let summary = run_drip(&h.state).await.unwrap();
        assert_eq!(summary.sent, 1);

        let sent = h.sent.lock().unwrap();
        assert!(sent[0].subject.contains("quiet"));
    }

    // Scenario D: dispatch table gone — every candidate fails closed and the
    // run reports an error instead of a success summary.
    #[tokio::test]
    async fn total_reservation_outage_is_a_run_error() {
        let h = harness();
        seed_owner(&h, 1, "acme", 1);
        seed_user(&h, 10, 1, "alice", Some("alice@acme.test"));

        let conn = Connection::open(&h.db_path).unwrap();
        conn.execute_batch("DROP TABLE dispatches;").unwrap();

        let err = run_drip(&h.state).await.unwrap_err();
        assert!(matches!(err, RunError::AllUnavailable { count: 1 }));
        assert!(h.sent.lock().unwrap().is_empty());
    }

    // An unreachable directory aborts the run outright.
    #[tokio::test]
    async fn directory_outage_is_a_run_error() {
        let h = harness();
        let conn = Connection::open(&h.db_path).unwrap();
        conn.execute_batch("DROP TABLE owners;").unwrap();

        let err = run_drip(&h.state).await.unwrap_err();
        assert!(matches!(err, RunError::Directory(_)));
    }

    #[tokio::test]
    async fn cap_prioritizes_onboarding_over_dormancy() {
        let mut config = NudgeConfig::default();
        config.drip.cap_min = 2;
        config.drip.cap_max = 2;
        let h = harness_with(config, false);

        // Two onboarding owners and two dormant ones.
        seed_owner(&h, 1, "new-a", 1);
        seed_user(&h, 10, 1, "ana", Some("ana@a.test"));
        seed_owner(&h, 2, "new-b", 1);
        seed_user(&h, 20, 2, "ben", Some("ben@b.test"));
        seed_owner(&h, 3, "old-c", 60);
        seed_user(&h, 30, 3, "cal", Some("cal@c.test"));
        seed_activity(&h, 3, 30, 41, 10);
        seed_owner(&h, 4, "old-d", 60);
        seed_user(&h, 40, 4, "dot", Some("dot@d.test"));
        seed_activity(&h, 4, 40, 42, 10);

        let summary = run_drip(&h.state).await.unwrap();
        assert_eq!(summary.cap, 2);
        assert_eq!(summary.classified, 4);
        assert_eq!(summary.sent, 2);

        let sent = h.sent.lock().unwrap();
        let recipients: Vec<&str> = sent.iter().map(|m| m.recipient.as_str()).collect();
        assert_eq!(recipients, vec!["ana@a.test", "ben@b.test"]);
    }

    #[tokio::test]
    async fn delivery_failure_keeps_the_reservation() {
        let h = harness_with(NudgeConfig::default(), true);
        seed_owner(&h, 1, "acme", 1);
        seed_user(&h, 10, 1, "alice", Some("alice@acme.test"));

        let summary = run_drip(&h.state).await.unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.delivery_failed, 1);

        // The slot stays reserved: a rerun must not retry the send.
        let rerun = run_drip(&h.state).await.unwrap();
        assert_eq!(rerun.classified, 0);
        assert_eq!(rerun.delivery_failed, 0);
    }

    #[tokio::test]
    async fn users_without_email_are_not_candidates() {
        let h = harness();
        seed_owner(&h, 1, "acme", 1);
        seed_user(&h, 10, 1, "alice", None);

        let summary = run_drip(&h.state).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.classified, 0);
        assert_eq!(summary.sent, 0);
    }

    #[tokio::test]
    async fn malformed_owner_row_skips_without_aborting() {
        let h = harness();
        seed_owner(&h, 1, "acme", 1);
        seed_user(&h, 10, 1, "alice", Some("alice@acme.test"));
        let conn = Connection::open(&h.db_path).unwrap();
        conn.execute(
            "INSERT INTO owners (id, login, installed_at) VALUES (2, 'broken', 'not-a-date')",
            [],
        )
        .unwrap();

        let summary = run_drip(&h.state).await.unwrap();
        assert_eq!(summary.skipped_malformed, 1);
        assert_eq!(summary.sent, 1);
    }
}
