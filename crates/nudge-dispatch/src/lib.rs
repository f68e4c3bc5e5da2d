//! `nudge-dispatch` — the idempotency gate in front of every send.
//!
//! One row per (user, slot) pair, inserted atomically before delivery. This
//! is the pipeline's sole write path and sole consistency guarantee: a rerun,
//! a retry, or two concurrent runs can never send the same slot twice. A
//! crash between reservation and delivery loses at most one email, which is
//! the accepted side of the tradeoff.

pub mod db;
pub mod error;
pub mod store;

pub use error::{DispatchError, Result};
pub use store::DispatchStore;
