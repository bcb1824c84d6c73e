use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use time::UtcOffset;
use time::macros::offset;
use tracing::{debug, error, warn};

use vigil_core::{Alert, now_utc};
use vigil_storage::{
    ChannelKind, ChannelStore, DeliveryRecord, DeliveryStatus, DeliveryStore, EntitlementChecker,
    Feature, NotificationChannel, RecipientStore, ZoneStore,
};

use crate::filters::{channel_accepts, in_quiet_hours, meets_threshold, voice_eligible};
use crate::resolve::resolve_recipients;
use crate::senders::ChannelSender;

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Fixed offset for the recipient-local clock used by quiet hours.
    pub quiet_hours_offset: UtcOffset,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            quiet_hours_offset: offset!(-10),
        }
    }
}

/// Outcome of one (recipient, channel) send.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub recipient_id: String,
    pub channel_id: String,
    pub channel_kind: ChannelKind,
    pub success: bool,
    pub error: Option<String>,
}

/// What one dispatch call did, end to end.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub alert_id: String,
    /// Recipients resolved by geography/zones/regions.
    pub candidates: usize,
    /// Candidates surviving the eligibility filters.
    pub eligible: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// The dispatch engine. Constructed once at startup and shared.
pub struct Dispatcher {
    recipients: Arc<dyn RecipientStore>,
    zones: Arc<dyn ZoneStore>,
    channels: Arc<dyn ChannelStore>,
    entitlements: Arc<dyn EntitlementChecker>,
    deliveries: Arc<dyn DeliveryStore>,
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        recipients: Arc<dyn RecipientStore>,
        zones: Arc<dyn ZoneStore>,
        channels: Arc<dyn ChannelStore>,
        entitlements: Arc<dyn EntitlementChecker>,
        deliveries: Arc<dyn DeliveryStore>,
        senders: Vec<Arc<dyn ChannelSender>>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            recipients,
            zones,
            channels,
            entitlements,
            deliveries,
            senders: senders.into_iter().map(|s| (s.kind(), s)).collect(),
            config,
        }
    }

    /// Resolve, filter and fan out one alert. Never raises; every
    /// failure is recorded in the report and the delivery log.
    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let mut report = DispatchReport {
            alert_id: alert.id.clone(),
            ..Default::default()
        };

        let candidates =
            match resolve_recipients(alert, &self.recipients, &self.zones).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    error!(alert_id = %alert.id, error = %err, "recipient resolution failed");
                    return report;
                }
            };
        report.candidates = candidates.len();

        let now = now_utc();
        let mut eligible = Vec::new();
        for recipient in candidates {
            // Filters in order, first failure wins.
            if !self
                .entitlements
                .permits(&recipient, Feature::Notifications)
                .await
            {
                debug!(recipient = %recipient.id, "entitlement denies notifications");
                continue;
            }
            if !meets_threshold(alert.severity, recipient.severity_threshold) {
                continue;
            }
            if in_quiet_hours(&recipient, now, self.config.quiet_hours_offset) {
                debug!(recipient = %recipient.id, "inside quiet hours, suppressing");
                continue;
            }
            eligible.push(recipient);
        }
        report.eligible = eligible.len();

        let mut sends = Vec::new();
        for recipient in &eligible {
            let channels = match self.channels.active_verified(&recipient.id).await {
                Ok(channels) => channels,
                Err(err) => {
                    warn!(recipient = %recipient.id, error = %err, "channel lookup failed");
                    continue;
                }
            };

            for channel in channels {
                if !channel_accepts(&channel, alert) {
                    continue;
                }
                if channel.kind == ChannelKind::Voice && !voice_eligible(alert) {
                    continue;
                }
                let gate = match channel.kind {
                    ChannelKind::Sms => Some(Feature::SmsChannel),
                    ChannelKind::Voice => Some(Feature::VoiceChannel),
                    ChannelKind::Email => None,
                };
                if let Some(feature) = gate
                    && !self.entitlements.permits(recipient, feature).await
                {
                    debug!(
                        recipient = %recipient.id,
                        kind = channel.kind.as_str(),
                        "entitlement denies channel"
                    );
                    continue;
                }
                let Some(sender) = self.senders.get(&channel.kind) else {
                    warn!(kind = channel.kind.as_str(), "no sender configured");
                    continue;
                };
                sends.push(self.send_one(alert, recipient.id.clone(), channel, sender.clone()));
            }
        }

        report.outcomes = join_all(sends).await;
        debug!(
            alert_id = %alert.id,
            candidates = report.candidates,
            eligible = report.eligible,
            sent = report.sent(),
            failed = report.failed(),
            "dispatch complete"
        );
        report
    }

    async fn send_one(
        &self,
        alert: &Alert,
        recipient_id: String,
        channel: NotificationChannel,
        sender: Arc<dyn ChannelSender>,
    ) -> DispatchOutcome {
        let (success, error) = match sender.send(&channel.destination, alert).await {
            Ok(result) if result.success => (true, None),
            Ok(result) => (false, result.error.or_else(|| Some("unknown error".into()))),
            Err(err) => (false, Some(err.to_string())),
        };

        if let Some(ref err) = error {
            warn!(
                recipient = %recipient_id,
                channel = %channel.id,
                kind = channel.kind.as_str(),
                error = %err,
                "channel send failed"
            );
        }

        let status = if success {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        };
        let record = DeliveryRecord::new(
            alert.id.clone(),
            recipient_id.clone(),
            &channel,
            status,
            error.clone(),
            now_utc(),
        );
        if let Err(err) = self.deliveries.record(record).await {
            error!(channel = %channel.id, error = %err, "delivery record write failed");
        }

        DispatchOutcome {
            recipient_id,
            channel_id: channel.id,
            channel_kind: channel.kind,
            success,
            error,
        }
    }
}
