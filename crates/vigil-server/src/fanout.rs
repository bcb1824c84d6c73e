//! Alert event fanout.
//!
//! Subscribes to the alert event bus and, for each event, feeds the
//! two delivery paths: the dispatch queue (channel notifications, new
//! alerts only — a re-synced row must not renotify every cycle) and
//! the live-connection broadcast (new and updated alerts, so open
//! clients stay current).

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vigil_core::{Alert, AlertBroadcaster, AlertEvent, AlertEventKind, format_rfc3339, now_utc};
use vigil_dispatch::DispatchSender;
use vigil_realtime::{ConnectionManager, ServerMessage};

/// Minimum radius for location-targeted live broadcasts; hyper-local
/// alerts still reach nearby clients.
const MIN_BROADCAST_RADIUS_MILES: f64 = 25.0;

pub fn spawn(
    events: AlertBroadcaster,
    manager: Arc<ConnectionManager>,
    dispatch: DispatchSender,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        info!("alert fanout started");
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(event) => handle_event(event, &manager, &dispatch).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "alert fanout lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("alert fanout stopped");
    })
}

async fn handle_event(
    event: AlertEvent,
    manager: &Arc<ConnectionManager>,
    dispatch: &DispatchSender,
) {
    if event.kind == AlertEventKind::Created {
        dispatch.enqueue(event.alert.clone()).await;
    }
    broadcast_alert(&event.alert, manager).await;
}

/// Push one alert to live sessions: location-targeted when the alert
/// has a point, global otherwise. Admin dashboards get the broadcast
/// notice, never the end-user payload stream.
pub async fn broadcast_alert(alert: &Alert, manager: &Arc<ConnectionManager>) {
    let payload = match serde_json::to_value(alert) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(alert_id = %alert.id, error = %err, "unserializable alert");
            return;
        }
    };
    let message = ServerMessage::Alert {
        data: payload.clone(),
        timestamp: format_rfc3339(now_utc()),
    };

    let sent = match (alert.latitude, alert.longitude) {
        (Some(lat), Some(lon)) => {
            let radius = alert
                .radius_miles
                .unwrap_or(MIN_BROADCAST_RADIUS_MILES)
                .max(MIN_BROADCAST_RADIUS_MILES);
            manager
                .broadcast_to_location(&message, lat, lon, radius)
                .await
        }
        _ => manager.broadcast_all(&message).await,
    };

    manager.notify_admins_alert_broadcast(payload, sent).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use time::macros::datetime;
    use tokio::sync::Mutex;
    use vigil_core::{Category, Severity};
    use vigil_realtime::{SessionSink, TransportError};

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<ServerMessage>>,
    }

    #[async_trait]
    impl SessionSink for RecordingSink {
        async fn send(&self, message: &ServerMessage) -> Result<(), TransportError> {
            self.messages.lock().await.push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn point_alerts_target_by_location() {
        let manager = ConnectionManager::new_shared();
        let near = Arc::new(RecordingSink::default());
        let far = Arc::new(RecordingSink::default());
        manager.connect("near", None, near.clone()).await;
        manager.connect("far", None, far.clone()).await;
        manager.subscribe_location("near", 21.31, -157.86).await;
        manager.subscribe_location("far", 19.72, -155.09).await;

        let mut alert = Alert::new(
            "t_1",
            "T",
            "T",
            Severity::Severe,
            Category::Weather,
            datetime!(2025-06-01 00:00:00 UTC),
            "test",
        );
        alert.latitude = Some(21.31);
        alert.longitude = Some(-157.86);
        alert.radius_miles = Some(10.0);

        broadcast_alert(&alert, &manager).await;

        let near_alerts = near
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| matches!(m, ServerMessage::Alert { .. }))
            .count();
        let far_alerts = far
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| matches!(m, ServerMessage::Alert { .. }))
            .count();
        assert_eq!(near_alerts, 1);
        assert_eq!(far_alerts, 0);
    }

    #[tokio::test]
    async fn region_only_alerts_broadcast_to_everyone() {
        let manager = ConnectionManager::new_shared();
        let sink = Arc::new(RecordingSink::default());
        manager.connect("s1", None, sink.clone()).await;

        let alert = Alert::new(
            "t_2",
            "T",
            "T",
            Severity::Minor,
            Category::Civil,
            datetime!(2025-06-01 00:00:00 UTC),
            "test",
        );
        broadcast_alert(&alert, &manager).await;

        let alerts = sink
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| matches!(m, ServerMessage::Alert { .. }))
            .count();
        assert_eq!(alerts, 1);
    }
}
