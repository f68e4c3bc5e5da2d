use async_trait::async_trait;

use crate::{error::NotifyError, types::OutboundEmail};

/// Common interface implemented by every delivery adapter (email, Slack, …).
///
/// Implementations must be `Send + Sync` so they can be stored in a
/// [`NotifierRegistry`](crate::registry::NotifierRegistry) and driven from
/// multiple Tokio tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable lowercase identifier for this adapter (e.g. `"email"`).
    ///
    /// Used as the key inside the registry and in per-delivery log fields;
    /// must be unique across registered adapters.
    fn name(&self) -> &str;

    /// Deliver a single message.
    ///
    /// Takes `&self` so a configured adapter can send concurrently without a
    /// mutable borrow. Failures are reported to the caller and logged; they
    /// never roll back the dispatch reservation that preceded the send.
    async fn send(&self, msg: &OutboundEmail) -> Result<(), NotifyError>;
}
