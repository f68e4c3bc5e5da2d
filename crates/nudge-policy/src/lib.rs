//! `nudge-policy` — the drip-email scheduling policy.
//!
//! # Overview
//!
//! Pure functions over in-memory snapshots; this crate owns no persisted
//! state and does no I/O. The gateway feeds it directory rows and the set of
//! already-dispatched slots, and it answers two questions per run:
//!
//! 1. [`classify`] — which lifecycle slot, if any, is due for a user today?
//! 2. [`select`] — given every due candidate and a per-run cap, which subset
//!    is actually sent?
//!
//! # Slot variants
//!
//! | Variant      | Keyed to                  | Repeats                      |
//! |--------------|---------------------------|------------------------------|
//! | `Onboarding` | days since install        | once per configured offset   |
//! | `Dormancy`   | days since last activity  | once per inactivity cycle    |

pub mod classify;
pub mod error;
pub mod select;
pub mod slot;

pub use classify::{classify, validate, Bucket, Candidate};
pub use error::{PolicyError, Result};
pub use select::{draw_cap, select};
pub use slot::Slot;
