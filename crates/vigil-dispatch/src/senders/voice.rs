//! Voice-call sender over a Twilio-style HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use vigil_core::Alert;
use vigil_storage::ChannelKind;

use super::{ChannelSender, SendResult};
use crate::error::DispatchError;
use crate::render::render_voice;

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct VoiceSenderConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub base_url: String,
}

pub struct VoiceSender {
    client: Client,
    config: VoiceSenderConfig,
}

impl VoiceSender {
    pub fn new(config: VoiceSenderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn twiml(script: &str) -> String {
        format!(
            "<Response><Say voice=\"alice\" language=\"en-US\">{}</Say></Response>",
            script
        )
    }
}

#[async_trait]
impl ChannelSender for VoiceSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Voice
    }

    async fn send(&self, destination: &str, alert: &Alert) -> Result<SendResult, DispatchError> {
        if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
            return Err(DispatchError::invalid_config("missing voice credentials"));
        }

        let content = render_voice(alert);
        let twiml = Self::twiml(&content.body);
        let response = self
            .client
            .post(format!(
                "{}/2010-04-01/Accounts/{}/Calls.json",
                self.config.base_url.trim_end_matches('/'),
                self.config.account_sid
            ))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", destination),
                ("From", self.config.from_number.as_str()),
                ("Twiml", twiml.as_str()),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let sid = body.get("sid").and_then(Value::as_str).map(str::to_string);
            Ok(SendResult::ok(sid))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Ok(SendResult::failed(format!(
                "voice provider returned {status}: {body}"
            )))
        }
    }
}
