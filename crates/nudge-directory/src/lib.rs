//! `nudge-directory` — read-only access to the installation directory and
//! the pull-request activity ledger.
//!
//! Both tables are written by collaborators outside this service (webhook
//! ingestion, the PR generator). The drip pipeline only ever reads them, so
//! this crate exposes queries and no mutation path.

pub mod db;
pub mod error;
pub mod store;

pub use error::{DirectoryError, Result};
pub use store::DirectoryStore;
