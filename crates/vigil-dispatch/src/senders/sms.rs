//! Short-message sender over a Twilio-style HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use vigil_core::Alert;
use vigil_storage::ChannelKind;

use super::{ChannelSender, SendResult};
use crate::error::DispatchError;
use crate::render::render_sms;

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct SmsSenderConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub base_url: String,
}

pub struct SmsSender {
    client: Client,
    config: SmsSenderConfig,
}

impl SmsSender {
    pub fn new(config: SmsSenderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, destination: &str, alert: &Alert) -> Result<SendResult, DispatchError> {
        if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
            return Err(DispatchError::invalid_config("missing sms credentials"));
        }

        let content = render_sms(alert);
        let response = self
            .client
            .post(format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                self.config.base_url.trim_end_matches('/'),
                self.config.account_sid
            ))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", destination),
                ("From", self.config.from_number.as_str()),
                ("Body", content.body.as_str()),
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
                "sms provider returned {status}: {body}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;
    use vigil_core::{Category, Severity};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert() -> Alert {
        Alert::new(
            "t_1",
            "High Surf",
            "Big waves",
            Severity::Moderate,
            Category::Marine,
            datetime!(2025-06-01 00:00:00 UTC),
            "test",
        )
    }

    fn config(base_url: String) -> SmsSenderConfig {
        SmsSenderConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+18085550000".into(),
            base_url,
        }
    }

    #[tokio::test]
    async fn successful_send_returns_provider_sid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(body_string_contains("MODERATE"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
            .mount(&server)
            .await;

        let sender = SmsSender::new(config(server.uri()));
        let result = sender.send("+18085550100", &alert()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.external_id.as_deref(), Some("SM1"));
    }

    #[tokio::test]
    async fn provider_rejection_is_an_unsuccessful_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("auth"))
            .mount(&server)
            .await;

        let sender = SmsSender::new(config(server.uri()));
        let result = sender.send("+18085550100", &alert()).await.unwrap();
        assert!(!result.success);
    }
}
