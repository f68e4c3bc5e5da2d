use tracing::{info, warn};

use crate::{error::NotifyError, notifier::Notifier, types::OutboundEmail};

/// Holds every configured delivery adapter.
///
/// Constructed once at startup from config and passed by reference to the
/// pipeline; the registry is the only place adapter clients live.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry with no registered adapters.
    pub fn new() -> Self {
        Self {
            notifiers: Vec::new(),
        }
    }

    /// Register a delivery adapter.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        info!(notifier = %notifier.name(), "registering notifier");
        self.notifiers.push(notifier);
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Registered adapter names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Deliver `msg` through every registered adapter.
    ///
    /// Per-adapter failures are logged and tolerated: delivery counts as
    /// successful when at least one adapter accepted the message. Only a
    /// full wipe-out (or an empty registry) is an error.
    pub async fn deliver(&self, msg: &OutboundEmail) -> Result<(), NotifyError> {
        if self.notifiers.is_empty() {
            return Err(NotifyError::NoNotifiers);
        }

        let mut failures = Vec::new();
        for notifier in &self.notifiers {
            match notifier.send(msg).await {
                Ok(()) => {
                    info!(
                        notifier = %notifier.name(),
                        recipient = %msg.recipient,
                        subject = %msg.subject,
                        "notification delivered"
                    );
                }
                Err(e) => {
                    warn!(
                        notifier = %notifier.name(),
                        recipient = %msg.recipient,
                        error = %e,
                        "notifier failed"
                    );
                    failures.push(format!("{}: {e}", notifier.name()));
                }
            }
        }

        if failures.len() == self.notifiers.len() {
            return Err(NotifyError::AllFailed(failures.join("; ")));
        }
        Ok(())
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
