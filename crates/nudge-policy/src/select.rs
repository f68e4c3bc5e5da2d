use crate::classify::Candidate;

/// Draw the per-run send cap from the inclusive `[min, max]` range.
///
/// A uniform daily cap is a bot-detectable cadence, so each run draws its
/// own. Uses the clock's sub-second nanos as the entropy source, avoiding a
/// rand dependency; the draw happens once per run and the value is then used
/// consistently for the whole batch.
pub fn draw_cap(min: u32, max: u32) -> u32 {
    if min >= max {
        return min;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    // The span is computed in u64: `max - min + 1` wraps to zero (and the
    // modulus panics) when the range covers all of u32.
    let span = u64::from(max) - u64::from(min) + 1;
    min + (u64::from(nanos) % span) as u32
}

/// Order all eligible candidates and truncate to `cap`.
///
/// Order: onboarding before dormancy (new-user experience first), then
/// ascending owner id, then ascending user id — fully deterministic, so
/// reruns on the same day with the same cap pick the same subset. Candidates
/// past the cap are simply dropped; they re-evaluate on the next run with no
/// backlog or carry-over boost.
pub fn select(mut candidates: Vec<Candidate>, cap: usize) -> Vec<Candidate> {
    candidates.sort_by_key(|c| (c.bucket, c.owner_id, c.user_id));
    candidates.truncate(cap);
    candidates
}
