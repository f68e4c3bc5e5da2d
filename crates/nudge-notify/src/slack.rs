//! Slack incoming-webhook adapter.
//!
//! Mirrors each lifecycle send into a fixed operator channel. The webhook
//! URL addresses the channel, so the message recipient only appears in the
//! rendered text.

use async_trait::async_trait;
use serde_json::json;

use nudge_core::config::SlackConfig;

use crate::{error::NotifyError, notifier::Notifier, types::OutboundEmail};

/// Posts notifications to a Slack incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn from_config(cfg: &SlackConfig) -> Result<Self, NotifyError> {
        if cfg.webhook_url.is_empty() {
            return Err(NotifyError::Config("slack webhook_url is empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            webhook_url: cfg.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, msg: &OutboundEmail) -> Result<(), NotifyError> {
        let payload = json!({
            "text": format!("*{}*\nto: {}\n{}", msg.subject, msg.recipient, msg.body),
        });

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::Http(format!(
                "slack webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
