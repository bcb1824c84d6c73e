use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vigil_core::{format_rfc3339, now_utc};
use vigil_geo::{GeoPoint, distance_miles};

use crate::protocol::ServerMessage;
use crate::session::{Session, SessionId, SessionSink, location_key};

/// Live connection counters and breakdowns. Safe to read while
/// connects, disconnects and broadcasts are in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub active_connections: usize,
    pub admin_connections: usize,
    pub total_connections: u64,
    pub peak_connections: u64,
    pub messages_sent: u64,
    pub connections_by_region: HashMap<String, usize>,
    /// Sessions grouped by their rounded location key.
    pub connections_by_location: HashMap<String, usize>,
    pub timestamp: String,
}

/// In-memory registry of live sessions with targeted and global
/// broadcast. Every write failure tears the failing session down and
/// leaves the rest untouched.
pub struct ConnectionManager {
    sessions: DashMap<SessionId, Session>,
    admins: DashMap<String, Arc<dyn SessionSink>>,
    total_connections: AtomicU64,
    peak_connections: AtomicU64,
    messages_sent: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            admins: DashMap::new(),
            total_connections: AtomicU64::new(0),
            peak_connections: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a session and send the welcome acknowledgment.
    pub async fn connect(
        &self,
        session_id: impl Into<SessionId>,
        recipient_id: Option<String>,
        sink: Arc<dyn SessionSink>,
    ) {
        let session_id = session_id.into();
        self.sessions
            .insert(session_id.clone(), Session::new(recipient_id, sink));
        self.total_connections.fetch_add(1, Ordering::SeqCst);

        let active = self.sessions.len() as u64;
        self.peak_connections.fetch_max(active, Ordering::SeqCst);

        info!(session = %session_id, active, "session connected");

        let welcome = ServerMessage::Connection {
            status: "connected".into(),
            session_id: session_id.clone(),
            timestamp: format_rfc3339(now_utc()),
        };
        if self.send(&session_id, &welcome).await {
            self.notify_admins_connection_event("connect", &session_id)
                .await;
        }
    }

    /// Remove a session. Admin notification is best-effort.
    pub async fn disconnect(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            let age = now_utc() - session.connected_at;
            info!(
                session = %session_id,
                age_secs = age.whole_seconds(),
                "session disconnected"
            );
            self.notify_admins_connection_event("disconnect", session_id)
                .await;
        }
    }

    pub async fn connect_admin(&self, admin_id: impl Into<String>, sink: Arc<dyn SessionSink>) {
        let admin_id = admin_id.into();
        let hello = ServerMessage::AdminConnected {
            stats: self.stats(),
        };
        if let Err(err) = sink.send(&hello).await {
            warn!(admin = %admin_id, error = %err, "admin welcome failed");
            return;
        }
        self.admins.insert(admin_id, sink);
    }

    pub fn disconnect_admin(&self, admin_id: &str) {
        self.admins.remove(admin_id);
    }

    /// Store the session's last-known location under a rounded
    /// grouping key and acknowledge.
    pub async fn subscribe_location(&self, session_id: &str, latitude: f64, longitude: f64) {
        {
            let Some(mut session) = self.sessions.get_mut(session_id) else {
                return;
            };
            session.location = Some(GeoPoint::new(latitude, longitude));
            session.location_key = Some(location_key(latitude, longitude));
        }

        let ack = ServerMessage::Subscription {
            status: "subscribed".into(),
            latitude,
            longitude,
            timestamp: format_rfc3339(now_utc()),
        };
        self.send(session_id, &ack).await;
    }

    /// Add region subscriptions to a session.
    pub fn subscribe_regions(&self, session_id: &str, regions: impl IntoIterator<Item = String>) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.subscribed_regions.extend(regions);
        }
    }

    /// Best-effort send to one session; a transport failure tears the
    /// session down. Returns whether the send succeeded.
    pub async fn send(&self, session_id: &str, message: &ServerMessage) -> bool {
        // Clone the sink out so no registry lock is held across the
        // write.
        let Some(sink) = self
            .sessions
            .get(session_id)
            .map(|session| Arc::clone(&session.sink))
        else {
            return false;
        };

        match sink.send(message).await {
            Ok(()) => {
                self.messages_sent.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(err) => {
                debug!(session = %session_id, error = %err, "send failed, tearing session down");
                self.disconnect(session_id).await;
                false
            }
        }
    }

    /// Send to every session a recipient has open (a recipient may be
    /// connected from several devices). Returns successful sends.
    pub async fn send_to_recipient(&self, recipient_id: &str, message: &ServerMessage) -> usize {
        let targets =
            self.snapshot(|session| session.recipient_id.as_deref() == Some(recipient_id));
        self.send_to_targets(targets, message).await
    }

    /// Send to every live session. Returns the number of successful
    /// sends; failing sessions are torn down without halting the rest.
    pub async fn broadcast_all(&self, message: &ServerMessage) -> usize {
        let targets = self.snapshot(|_| true);
        self.send_to_targets(targets, message).await
    }

    /// Send to sessions subscribed to `region`.
    pub async fn broadcast_to_region(&self, message: &ServerMessage, region: &str) -> usize {
        let targets = self.snapshot(|session| session.subscribed_regions.contains(region));
        self.send_to_targets(targets, message).await
    }

    /// Send to sessions whose last-known location is within
    /// `radius_miles` of the center. Sessions without a location are
    /// skipped, not failed.
    pub async fn broadcast_to_location(
        &self,
        message: &ServerMessage,
        center_lat: f64,
        center_lon: f64,
        radius_miles: f64,
    ) -> usize {
        let targets = self.snapshot(|session| {
            session.location.is_some_and(|loc| {
                distance_miles(center_lat, center_lon, loc.latitude, loc.longitude)
                    <= radius_miles
            })
        });
        self.send_to_targets(targets, message).await
    }

    /// Admin stream: an alert broadcast went out to `recipients`
    /// sessions.
    pub async fn notify_admins_alert_broadcast(
        &self,
        alert: serde_json::Value,
        recipients: usize,
    ) {
        let message = ServerMessage::AlertBroadcast {
            alert,
            recipients,
            timestamp: format_rfc3339(now_utc()),
        };
        self.send_admins(&message).await;
    }

    /// Read-only snapshot of the counters.
    pub fn stats(&self) -> ConnectionStats {
        let mut by_region: HashMap<String, usize> = HashMap::new();
        let mut by_location: HashMap<String, usize> = HashMap::new();
        for entry in self.sessions.iter() {
            for region in &entry.value().subscribed_regions {
                *by_region.entry(region.clone()).or_default() += 1;
            }
            if let Some(key) = &entry.value().location_key {
                *by_location.entry(key.clone()).or_default() += 1;
            }
        }

        ConnectionStats {
            active_connections: self.sessions.len(),
            admin_connections: self.admins.len(),
            total_connections: self.total_connections.load(Ordering::SeqCst),
            peak_connections: self.peak_connections.load(Ordering::SeqCst),
            messages_sent: self.messages_sent.load(Ordering::SeqCst),
            connections_by_region: by_region,
            connections_by_location: by_location,
            timestamp: format_rfc3339(now_utc()),
        }
    }

    fn snapshot(
        &self,
        filter: impl Fn(&Session) -> bool,
    ) -> Vec<(SessionId, Arc<dyn SessionSink>)> {
        self.sessions
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| (entry.key().clone(), Arc::clone(&entry.value().sink)))
            .collect()
    }

    async fn send_to_targets(
        &self,
        targets: Vec<(SessionId, Arc<dyn SessionSink>)>,
        message: &ServerMessage,
    ) -> usize {
        let mut sent = 0;
        let mut dead = Vec::new();

        for (session_id, sink) in targets {
            match sink.send(message).await {
                Ok(()) => {
                    self.messages_sent.fetch_add(1, Ordering::SeqCst);
                    sent += 1;
                }
                Err(err) => {
                    debug!(session = %session_id, error = %err, "broadcast write failed");
                    dead.push(session_id);
                }
            }
        }

        for session_id in dead {
            self.disconnect(&session_id).await;
        }
        sent
    }

    async fn notify_admins_connection_event(&self, event: &str, session_id: &str) {
        let message = ServerMessage::ConnectionEvent {
            event: event.into(),
            session_id: session_id.into(),
            active_connections: self.sessions.len(),
            timestamp: format_rfc3339(now_utc()),
        };
        self.send_admins(&message).await;
    }

    /// Failure to notify one admin never blocks the others; dead admin
    /// sockets are dropped.
    async fn send_admins(&self, message: &ServerMessage) {
        let admins: Vec<(String, Arc<dyn SessionSink>)> = self
            .admins
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        for (admin_id, sink) in admins {
            if let Err(err) = sink.send(message).await {
                debug!(admin = %admin_id, error = %err, "dropping dead admin session");
                self.admins.remove(&admin_id);
            }
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
