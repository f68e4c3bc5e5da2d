use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nudge_core::config::DripConfig;
use nudge_core::types::{ActivityRecord, Owner, User};

use crate::error::{PolicyError, Result};
use crate::slot::Slot;

/// Lifecycle bucket a candidate was classified into.
///
/// Ordering matters: onboarding candidates are sent before dormancy
/// candidates when the cap truncates the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Onboarding,
    Dormancy,
}

/// A user deemed eligible for one lifecycle email this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub owner_id: i64,
    pub user_id: i64,
    pub user_login: String,
    pub owner_login: String,
    /// Delivery address — classification guarantees this is present.
    pub email: String,
    pub slot: Slot,
    pub bucket: Bucket,
}

/// Check the drip configuration for internal consistency.
///
/// Called once at startup so classification and selection can assume sane
/// bounds afterwards.
pub fn validate(policy: &DripConfig) -> Result<()> {
    if policy.cap_min > policy.cap_max {
        return Err(PolicyError::InvalidPolicy(format!(
            "cap_min {} exceeds cap_max {}",
            policy.cap_min, policy.cap_max
        )));
    }
    if policy.onboarding_slot_count == 0 {
        return Err(PolicyError::InvalidPolicy(
            "onboarding_slot_count must be at least 1".into(),
        ));
    }
    if policy.onboarding_slot_count > 1 && policy.onboarding_gap_days == 0 {
        return Err(PolicyError::InvalidPolicy(
            "onboarding_gap_days must be non-zero with multiple slots".into(),
        ));
    }
    if policy.dormancy_threshold_days == 0 {
        return Err(PolicyError::InvalidPolicy(
            "dormancy_threshold_days must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Classify one (owner, user) pair into a lifecycle slot, or `None` when
/// nothing is due.
///
/// `activity` is the owner's ledger within the lookback window (any order);
/// `sent_slots` is the set of slot ids already dispatched to this user.
///
/// Rules, checked in order:
/// - uninstalled owner → ineligible;
/// - user without an email address → ineligible (nothing deliverable);
/// - days-since-install exactly on a configured onboarding offset whose slot
///   was not yet sent → onboarding;
/// - days since the newest activity record (or since install when the ledger
///   is empty) at or past the dormancy threshold, current cycle unsent →
///   dormancy;
/// - otherwise ineligible.
///
/// The check runs at send time, not ahead of it: a user who churns back to
/// active before the run simply stops matching the dormancy rule.
pub fn classify(
    owner: &Owner,
    user: &User,
    activity: &[ActivityRecord],
    sent_slots: &HashSet<String>,
    policy: &DripConfig,
    now: DateTime<Utc>,
) -> Option<Candidate> {
    if !owner.is_active() {
        return None;
    }
    let email = user.email.clone()?;

    let days_since_install = (now - owner.installed_at).num_days();

    // Onboarding: exact-day match against the configured offset sequence.
    if days_since_install >= 0 {
        for k in 0..policy.onboarding_slot_count {
            let offset = policy.onboarding_first_day + k * policy.onboarding_gap_days;
            if days_since_install == i64::from(offset) {
                let slot = Slot::Onboarding { day: offset };
                if !sent_slots.contains(&slot.id()) {
                    return Some(candidate(owner, user, email, slot, Bucket::Onboarding));
                }
            }
        }
    }

    // Dormancy: measured from the newest activity record, falling back to
    // the install date for owners that never produced a pull request.
    let last_seen = activity
        .iter()
        .map(|a| a.created_at)
        .max()
        .unwrap_or(owner.installed_at);
    let days_dormant = (now - last_seen).num_days();

    if days_dormant >= i64::from(policy.dormancy_threshold_days) {
        let cycle = (days_dormant / i64::from(policy.dormancy_threshold_days)) as u32;
        let slot = Slot::Dormancy { cycle };
        if !sent_slots.contains(&slot.id()) {
            return Some(candidate(owner, user, email, slot, Bucket::Dormancy));
        }
    }

    None
}

fn candidate(owner: &Owner, user: &User, email: String, slot: Slot, bucket: Bucket) -> Candidate {
    Candidate {
        owner_id: owner.id,
        user_id: user.id,
        user_login: user.login.clone(),
        owner_login: owner.login.clone(),
        email,
        slot,
        bucket,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> DripConfig {
        // Offsets: days 1, 3, 5, 7. Dormancy threshold: 7 days.
        DripConfig::default()
    }

    fn owner_installed_days_ago(days: i64, now: DateTime<Utc>) -> Owner {
        Owner {
            id: 1,
            login: "acme".into(),
            installed_at: now - Duration::days(days),
            uninstalled_at: None,
        }
    }

    fn user() -> User {
        User {
            id: 10,
            login: "alice".into(),
            email: Some("alice@acme.test".into()),
            owner_id: 1,
        }
    }

    fn activity_days_ago(days: i64, now: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord {
            owner_id: 1,
            user_id: 10,
            pull_number: 99,
            created_at: now - Duration::days(days),
            is_test_passed: true,
        }
    }

    #[test]
    fn day_one_owner_gets_first_onboarding_slot() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(1, now);
        let got = classify(&owner, &user(), &[], &HashSet::new(), &policy(), now).unwrap();
        assert_eq!(got.slot, Slot::Onboarding { day: 1 });
        assert_eq!(got.bucket, Bucket::Onboarding);
        assert_eq!(got.email, "alice@acme.test");
    }

    #[test]
    fn one_day_short_of_an_offset_is_not_eligible() {
        let now = Utc::now();
        // Offsets are 1,3,5,7 — day 2 sits between them and day 4 likewise.
        for days in [0, 2, 4, 6] {
            let owner = owner_installed_days_ago(days, now);
            // Recent activity keeps dormancy out of the picture.
            let recent = [activity_days_ago(0, now)];
            assert!(
                classify(&owner, &user(), &recent, &HashSet::new(), &policy(), now).is_none(),
                "day {days} must not match any offset"
            );
        }
    }

    #[test]
    fn exact_offset_is_eligible() {
        let now = Utc::now();
        for day in [1u32, 3, 5, 7] {
            let owner = owner_installed_days_ago(i64::from(day), now);
            let recent = [activity_days_ago(0, now)];
            let got =
                classify(&owner, &user(), &recent, &HashSet::new(), &policy(), now).unwrap();
            assert_eq!(got.slot, Slot::Onboarding { day });
        }
    }

    #[test]
    fn already_sent_slot_is_skipped() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(1, now);
        let mut sent = HashSet::new();
        sent.insert("onboarding_day_1".to_string());
        let recent = [activity_days_ago(0, now)];
        assert!(classify(&owner, &user(), &recent, &sent, &policy(), now).is_none());
    }

    #[test]
    fn uninstalled_owner_is_ineligible() {
        let now = Utc::now();
        let mut owner = owner_installed_days_ago(1, now);
        owner.uninstalled_at = Some(now);
        assert!(classify(&owner, &user(), &[], &HashSet::new(), &policy(), now).is_none());
    }

    #[test]
    fn user_without_email_is_ineligible() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(1, now);
        let mut u = user();
        u.email = None;
        assert!(classify(&owner, &u, &[], &HashSet::new(), &policy(), now).is_none());
    }

    #[test]
    fn eight_days_idle_crosses_the_dormancy_threshold() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(30, now);
        let idle = [activity_days_ago(8, now)];
        let got = classify(&owner, &user(), &idle, &HashSet::new(), &policy(), now).unwrap();
        assert_eq!(got.slot, Slot::Dormancy { cycle: 1 });
        assert_eq!(got.bucket, Bucket::Dormancy);
    }

    #[test]
    fn six_days_idle_is_still_active() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(30, now);
        let idle = [activity_days_ago(6, now)];
        assert!(classify(&owner, &user(), &idle, &HashSet::new(), &policy(), now).is_none());
    }

    #[test]
    fn zero_activity_counts_dormancy_from_install() {
        let now = Utc::now();
        // Installed 9 days ago, never produced a PR: dormant since install.
        // Day 9 also misses every onboarding offset (1,3,5,7).
        let owner = owner_installed_days_ago(9, now);
        let got = classify(&owner, &user(), &[], &HashSet::new(), &policy(), now).unwrap();
        assert_eq!(got.slot, Slot::Dormancy { cycle: 1 });
    }

    #[test]
    fn dormancy_repeats_in_the_next_cycle() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(60, now);
        let idle = [activity_days_ago(15, now)];
        let mut sent = HashSet::new();
        sent.insert("dormancy_cycle_1".to_string());
        // 15 days idle with a 7-day threshold lands in cycle 2.
        let got = classify(&owner, &user(), &idle, &sent, &policy(), now).unwrap();
        assert_eq!(got.slot, Slot::Dormancy { cycle: 2 });
    }

    #[test]
    fn dormancy_sent_this_cycle_is_not_repeated() {
        let now = Utc::now();
        let owner = owner_installed_days_ago(60, now);
        let idle = [activity_days_ago(8, now)];
        let mut sent = HashSet::new();
        sent.insert("dormancy_cycle_1".to_string());
        assert!(classify(&owner, &user(), &idle, &sent, &policy(), now).is_none());
    }

    #[test]
    fn onboarding_day_coinciding_with_dormancy_prefers_onboarding() {
        let now = Utc::now();
        // Day 7 is both the last onboarding offset and the dormancy
        // threshold when the owner never produced activity.
        let owner = owner_installed_days_ago(7, now);
        let got = classify(&owner, &user(), &[], &HashSet::new(), &policy(), now).unwrap();
        assert_eq!(got.bucket, Bucket::Onboarding);

        // Once the day-7 slot is sent, the same day falls through to dormancy.
        let mut sent = HashSet::new();
        sent.insert("onboarding_day_7".to_string());
        let got = classify(&owner, &user(), &[], &sent, &policy(), now).unwrap();
        assert_eq!(got.bucket, Bucket::Dormancy);
    }

    #[test]
    fn validate_rejects_inverted_cap_bounds() {
        let mut p = policy();
        p.cap_min = 10;
        p.cap_max = 5;
        assert!(validate(&p).is_err());
        assert!(validate(&policy()).is_ok());
    }
}
