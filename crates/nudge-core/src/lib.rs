//! `nudge-core` — shared types, configuration, and base error for the
//! nudge lifecycle-notification service.

pub mod config;
pub mod error;
pub mod types;

pub use config::NudgeConfig;
pub use error::{NudgeError, Result};
pub use types::{ActivityRecord, Owner, User};
