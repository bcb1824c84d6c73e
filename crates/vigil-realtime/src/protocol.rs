//! Wire messages exchanged over live connections.

use serde::{Deserialize, Serialize};

use crate::manager::ConnectionStats;

/// Server-to-client messages. The `type` tag is the discriminant the
/// clients switch on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome acknowledgment after connect.
    Connection {
        status: String,
        session_id: String,
        timestamp: String,
    },
    /// Acknowledgment of a location subscription.
    Subscription {
        status: String,
        latitude: f64,
        longitude: f64,
        timestamp: String,
    },
    /// An alert payload for end-user display.
    Alert {
        data: serde_json::Value,
        timestamp: String,
    },
    /// Keepalive reply; admin pongs carry a stats snapshot.
    Pong {
        timestamp: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<ConnectionStats>,
    },
    /// First message on an admin socket.
    AdminConnected { stats: ConnectionStats },
    /// Admin stream: a client connected or disconnected.
    ConnectionEvent {
        event: String,
        session_id: String,
        active_connections: usize,
        timestamp: String,
    },
    /// Admin stream: an alert broadcast went out.
    AlertBroadcast {
        alert: serde_json::Value,
        recipients: usize,
        timestamp: String,
    },
}

/// Client-to-server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Subscribe {
        #[serde(default)]
        location: Option<LocationSubscription>,
        #[serde(default)]
        regions: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationSubscription {
    pub latitude: f64,
    pub longitude: f64,
}
