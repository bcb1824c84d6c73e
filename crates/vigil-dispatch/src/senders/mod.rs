pub mod email;
pub mod sms;
pub mod voice;

use async_trait::async_trait;

use vigil_core::Alert;
use vigil_storage::ChannelKind;

use crate::error::DispatchError;

/// Result of one channel send.
#[derive(Debug)]
pub struct SendResult {
    pub success: bool,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn ok(external_id: Option<String>) -> Self {
        Self {
            success: true,
            external_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            external_id: None,
            error: Some(error.into()),
        }
    }
}

/// One outbound channel provider.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Deliver the alert to one destination. Provider rejections come
    /// back as an unsuccessful `SendResult`; an `Err` means the send
    /// could not even be attempted (bad config, transport failure).
    async fn send(&self, destination: &str, alert: &Alert) -> Result<SendResult, DispatchError>;
}

pub use email::EmailSender;
pub use sms::SmsSender;
pub use voice::VoiceSender;
