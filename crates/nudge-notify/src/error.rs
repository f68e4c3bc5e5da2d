use thiserror::Error;

/// Errors that can occur within any notification adapter.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The adapter-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// SMTP transport or message-building failure.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// HTTP delivery (Slack webhook) failure.
    #[error("HTTP delivery error: {0}")]
    Http(String),

    /// A slot template failed to render.
    #[error("Template error: {0}")]
    Template(String),

    /// The registry has no adapters to deliver through.
    #[error("No notifiers registered")]
    NoNotifiers,

    /// Every registered adapter failed for this message.
    #[error("All notifiers failed: {0}")]
    AllFailed(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
