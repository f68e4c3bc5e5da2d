//! SMTP email adapter via `lettre` with STARTTLS.

use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use nudge_core::config::EmailConfig;

use crate::{error::NotifyError, notifier::Notifier, types::OutboundEmail};

/// Sends lifecycle emails through an SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build an `SmtpNotifier` from config.
    ///
    /// The port defaults to 587 (STARTTLS). Credentials are resolved from
    /// the `SMTP_USERNAME` and `SMTP_PASSWORD` environment variables; if
    /// both are set they are attached to the transport, otherwise the
    /// connection is unauthenticated.
    pub fn from_config(cfg: &EmailConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = cfg
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .map_err(|e| NotifyError::Config(e.to_string()))?
            .port(cfg.smtp_port.unwrap_or(587));

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, msg: &OutboundEmail) -> Result<(), NotifyError> {
        let to: Mailbox = msg
            .recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Smtp(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&msg.subject)
            .body(msg.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        Ok(())
    }
}
