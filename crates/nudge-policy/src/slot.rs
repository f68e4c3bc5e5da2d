use serde::{Deserialize, Serialize};

/// One scheduled lifecycle email.
///
/// The stable string form ([`Slot::id`]) is both the persistence key in the
/// dispatches table and the template key for rendering, so it must never
/// change for an existing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    /// Onboarding step keyed to days since install.
    Onboarding { day: u32 },

    /// Dormancy reminder for one inactivity cycle. Cycle `k` covers
    /// `[k * threshold, (k + 1) * threshold)` days without activity, so each
    /// cycle gets its own (user, slot) reservation and the reminder repeats
    /// naturally as dormancy deepens.
    Dormancy { cycle: u32 },
}

impl Slot {
    /// Stable identifier, e.g. `onboarding_day_3` or `dormancy_cycle_1`.
    pub fn id(&self) -> String {
        match self {
            Slot::Onboarding { day } => format!("onboarding_day_{day}"),
            Slot::Dormancy { cycle } => format!("dormancy_cycle_{cycle}"),
        }
    }

    /// Template key used to look up subject/body templates.
    ///
    /// Onboarding content differs per step; dormancy reminders share one
    /// template across cycles.
    pub fn template_key(&self) -> String {
        match self {
            Slot::Onboarding { day } => format!("onboarding_day_{day}"),
            Slot::Dormancy { .. } => "dormancy".to_string(),
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(day) = s.strip_prefix("onboarding_day_") {
            let day = day.parse().map_err(|_| format!("bad slot id: {s}"))?;
            return Ok(Slot::Onboarding { day });
        }
        if let Some(cycle) = s.strip_prefix("dormancy_cycle_") {
            let cycle = cycle.parse().map_err(|_| format!("bad slot id: {s}"))?;
            return Ok(Slot::Dormancy { cycle });
        }
        Err(format!("unknown slot id: {s}"))
    }
}
