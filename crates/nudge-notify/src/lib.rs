//! `nudge-notify` — delivery adapters for lifecycle notifications.
//!
//! The [`Notifier`] trait is the seam between the drip pipeline and the
//! outside world. Adapters (SMTP email, Slack incoming webhook) are
//! registered in an explicitly constructed [`NotifierRegistry`] that the
//! gateway owns and passes by reference — no ambient global client state.

pub mod email;
pub mod error;
pub mod notifier;
pub mod registry;
pub mod slack;
pub mod templates;
pub mod types;

pub use email::SmtpNotifier;
pub use error::NotifyError;
pub use notifier::Notifier;
pub use registry::NotifierRegistry;
pub use slack::SlackNotifier;
pub use templates::{SlotContext, TemplateEngine};
pub use types::OutboundEmail;
