use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use vigil_geo::GeoPoint;

use crate::protocol::ServerMessage;

pub type SessionId = String;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}

/// Write side of one live connection. The transport layer implements
/// this over its socket; tests implement it over buffers.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn send(&self, message: &ServerMessage) -> Result<(), TransportError>;
}

/// One live client session. Owned exclusively by the manager.
pub(crate) struct Session {
    pub recipient_id: Option<String>,
    pub connected_at: OffsetDateTime,
    pub location: Option<GeoPoint>,
    pub location_key: Option<String>,
    pub subscribed_regions: HashSet<String>,
    pub sink: Arc<dyn SessionSink>,
}

impl Session {
    pub fn new(recipient_id: Option<String>, sink: Arc<dyn SessionSink>) -> Self {
        Self {
            recipient_id,
            connected_at: OffsetDateTime::now_utc(),
            location: None,
            location_key: None,
            subscribed_regions: HashSet::new(),
            sink,
        }
    }
}

/// Coarse grouping key: coordinates rounded to two decimals.
pub(crate) fn location_key(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.2}_{longitude:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_keys_round_to_two_decimals() {
        assert_eq!(location_key(21.3099, -157.8581), "21.31_-157.86");
        assert_eq!(location_key(21.0, -157.0), "21.00_-157.00");
    }
}
