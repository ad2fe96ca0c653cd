use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::config::MailConfig;

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Delivers mail through an HTTP relay (JSON POST). The request is bounded
/// by the configured timeout so a slow relay cannot hang a request handler.
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            relay_url: cfg.relay_url.clone(),
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(&self.relay_url)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?
            .error_for_status()?;
        info!(to = %to, status = %resp.status(), "mail dispatched");
        Ok(())
    }
}
