//! Eligibility filters, applied in order with short-circuiting:
//! entitlement, severity threshold, quiet hours, then per-channel
//! overrides.

use time::{OffsetDateTime, UtcOffset};

use vigil_core::{Alert, Severity};
use vigil_storage::{NotificationChannel, Recipient, Zone};

/// Severity threshold comparison used everywhere a threshold appears.
pub fn meets_threshold(alert_severity: Severity, threshold: Severity) -> bool {
    alert_severity.rank() >= threshold.rank()
}

/// Whether the recipient's local hour falls inside their quiet-hour
/// window. Quiet hours suppress sends unconditionally, including for
/// extreme alerts; there is deliberately no severity exception.
pub fn in_quiet_hours(recipient: &Recipient, now: OffsetDateTime, offset: UtcOffset) -> bool {
    match recipient.quiet_hours {
        Some(window) => window.contains(now.to_offset(offset).hour()),
        None => false,
    }
}

/// Channel-level override filter: optional severity floor plus an
/// optional category allow-list.
pub fn channel_accepts(channel: &NotificationChannel, alert: &Alert) -> bool {
    if let Some(threshold) = channel.severity_threshold
        && !meets_threshold(alert.severity, threshold)
    {
        return false;
    }
    if let Some(ref categories) = channel.categories
        && !categories.contains(&alert.category)
    {
        return false;
    }
    true
}

/// Zone-level filter, same shape as the channel filter.
pub fn zone_accepts(zone: &Zone, alert: &Alert) -> bool {
    if let Some(threshold) = zone.severity_threshold
        && !meets_threshold(alert.severity, threshold)
    {
        return false;
    }
    if let Some(ref categories) = zone.categories
        && !categories.contains(&alert.category)
    {
        return false;
    }
    true
}

/// Voice calls are reserved for severe and extreme alerts.
pub fn voice_eligible(alert: &Alert) -> bool {
    alert.severity >= Severity::Severe
}
