//! Electronic-message sender over a SendGrid-style HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use vigil_core::Alert;
use vigil_storage::ChannelKind;

use super::{ChannelSender, SendResult};
use crate::error::DispatchError;
use crate::render::render_email;

pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone)]
pub struct EmailSenderConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
    pub base_url: String,
}

pub struct EmailSender {
    client: Client,
    config: EmailSenderConfig,
}

impl EmailSender {
    pub fn new(config: EmailSenderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, destination: &str, alert: &Alert) -> Result<SendResult, DispatchError> {
        if self.config.api_key.is_empty() {
            return Err(DispatchError::invalid_config("missing email api key"));
        }

        let content = render_email(alert);
        let payload = json!({
            "personalizations": [{"to": [{"email": destination}]}],
            "from": {"email": self.config.from_email, "name": self.config.from_name},
            "subject": content.subject,
            "content": [
                {"type": "text/plain", "value": content.body},
                {"type": "text/html", "value": content.html_body},
            ],
        });

        let response = self
            .client
            .post(format!(
                "{}/v3/mail/send",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(SendResult::ok(message_id))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Ok(SendResult::failed(format!(
                "email provider returned {status}: {body}"
            )))
        }
    }
}
