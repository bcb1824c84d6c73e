use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use vigil_core::{Category, Severity};
use vigil_geo::{GeoPoint, GeoPolygon};

/// Outcome of an upsert keyed by canonical external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// A recipient-local time-of-day window during which no channel sends
/// are attempted. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    /// Hour 0-23, inclusive start.
    pub start: u8,
    /// Hour 0-23, exclusive end.
    pub end: u8,
}

impl QuietHours {
    /// Whether `hour` falls inside the window, with wraparound when
    /// the window crosses midnight.
    pub fn contains(&self, hour: u8) -> bool {
        if self.start > self.end {
            hour >= self.start || hour < self.end
        } else {
            self.start <= hour && hour < self.end
        }
    }
}

/// A notification recipient. Read-only to the engine; ownership of
/// recipient state belongs to the account layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<GeoPoint>,
    /// Personal alert radius around the home location.
    pub alert_radius_miles: f64,

    #[serde(default)]
    pub subscribed_regions: Vec<String>,

    pub severity_threshold: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,

    pub is_active: bool,
}

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            home: None,
            alert_radius_miles: 25.0,
            subscribed_regions: Vec::new(),
            severity_threshold: Severity::Minor,
            quiet_hours: None,
            is_active: true,
        }
    }
}

/// Notification channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
    Voice,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Voice => "voice",
        }
    }
}

/// A recipient-owned delivery destination. The engine only reads
/// active and verified channels and writes delivery outcomes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub recipient_id: String,
    pub kind: ChannelKind,
    /// Address string: email address, phone number.
    pub destination: String,

    pub is_verified: bool,
    pub is_active: bool,

    /// Optional override: only accept alerts at or above this severity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_threshold: Option<Severity>,
    /// Optional override: only accept alerts in these categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

impl NotificationChannel {
    pub fn new(
        recipient_id: impl Into<String>,
        kind: ChannelKind,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient_id.into(),
            kind,
            destination: destination.into(),
            is_verified: true,
            is_active: true,
            severity_threshold: None,
            categories: None,
        }
    }
}

/// A recipient-defined custom geofence, independent of the home
/// location, with its own severity/category filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub recipient_id: String,
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_miles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<GeoPolygon>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_threshold: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,

    pub is_active: bool,
}

impl Zone {
    pub fn circle(
        recipient_id: impl Into<String>,
        name: impl Into<String>,
        center: GeoPoint,
        radius_miles: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient_id.into(),
            name: name.into(),
            center: Some(center),
            radius_miles: Some(radius_miles),
            polygon: None,
            severity_threshold: None,
            categories: None,
            is_active: true,
        }
    }

    pub fn polygon(
        recipient_id: impl Into<String>,
        name: impl Into<String>,
        polygon: GeoPolygon,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient_id.into(),
            name: name.into(),
            center: None,
            radius_miles: None,
            polygon: Some(polygon),
            severity_threshold: None,
            categories: None,
            is_active: true,
        }
    }
}

/// Entitlement features gating outbound delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Any outbound notification at all.
    Notifications,
    /// Short-message channel sends.
    SmsChannel,
    /// Voice-call channel sends.
    VoiceChannel,
    /// Historical alert export.
    History,
}

/// Delivery outcome for one (recipient, channel) send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// A recorded channel-send outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub alert_id: String,
    pub recipient_id: String,
    pub channel_id: String,
    pub channel_kind: ChannelKind,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

impl DeliveryRecord {
    pub fn new(
        alert_id: impl Into<String>,
        recipient_id: impl Into<String>,
        channel: &NotificationChannel,
        status: DeliveryStatus,
        error: Option<String>,
        sent_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_id: alert_id.into(),
            recipient_id: recipient_id.into(),
            channel_id: channel.id.clone(),
            channel_kind: channel.kind,
            status,
            error,
            sent_at,
        }
    }
}

/// Aggregate delivery counters for operator dashboards.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub sent: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_hours_plain_window() {
        let window = QuietHours { start: 9, end: 17 };
        assert!(!window.contains(8));
        assert!(window.contains(9));
        assert!(window.contains(16));
        assert!(!window.contains(17));
    }

    #[test]
    fn quiet_hours_wraparound() {
        let window = QuietHours { start: 22, end: 7 };
        assert!(window.contains(23));
        assert!(window.contains(0));
        assert!(window.contains(6));
        assert!(!window.contains(7));
        assert!(!window.contains(12));
    }

    #[test]
    fn recipient_defaults() {
        let recipient = Recipient::new("r1");
        assert_eq!(recipient.alert_radius_miles, 25.0);
        assert_eq!(recipient.severity_threshold, Severity::Minor);
        assert!(recipient.is_active);
    }

    #[test]
    fn channel_kind_labels() {
        assert_eq!(ChannelKind::Email.as_str(), "email");
        assert_eq!(ChannelKind::Voice.as_str(), "voice");
    }
}
