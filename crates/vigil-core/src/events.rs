//! Alert event bus.
//!
//! Source adapters publish here when an upsert lands; the dispatch
//! engine and the live-connection fanout subscribe. Built on tokio's
//! broadcast channel, so slow receivers drop old events rather than
//! back-pressuring ingestion.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::alert::Alert;

/// Default buffer size for the broadcast channel.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// What happened to the alert row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventKind {
    /// First sight of this external id.
    Created,
    /// Existing row overwritten by a re-sync.
    Updated,
}

/// An alert lifecycle event.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    pub alert: Alert,
}

impl AlertEvent {
    pub fn created(alert: Alert) -> Self {
        Self {
            kind: AlertEventKind::Created,
            alert,
        }
    }

    pub fn updated(alert: Alert) -> Self {
        Self {
            kind: AlertEventKind::Updated,
            alert,
        }
    }
}

/// Cloneable multi-producer, multi-consumer alert event broadcaster.
#[derive(Clone)]
pub struct AlertBroadcaster {
    sender: broadcast::Sender<AlertEvent>,
}

impl AlertBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers. Returns the number of
    /// subscribers that received it; 0 when nobody is listening.
    pub fn send(&self, event: AlertEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AlertBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AlertBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{Category, Severity};
    use time::macros::datetime;

    fn sample_alert() -> Alert {
        Alert::new(
            "test_ev",
            "Test",
            "Test",
            Severity::Minor,
            Category::Other,
            datetime!(2025-06-01 00:00:00 UTC),
            "Test",
        )
    }

    #[test]
    fn send_without_subscribers_is_dropped() {
        let broadcaster = AlertBroadcaster::new();
        assert_eq!(broadcaster.send(AlertEvent::created(sample_alert())), 0);
    }

    #[tokio::test]
    async fn send_and_receive() {
        let broadcaster = AlertBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let delivered = broadcaster.send(AlertEvent::created(sample_alert()));
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, AlertEventKind::Created);
        assert_eq!(event.alert.external_id, "test_ev");
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive() {
        let broadcaster = AlertBroadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        assert_eq!(broadcaster.send(AlertEvent::updated(sample_alert())), 2);
        assert_eq!(rx1.recv().await.unwrap().kind, AlertEventKind::Updated);
        assert_eq!(rx2.recv().await.unwrap().kind, AlertEventKind::Updated);
    }
}
