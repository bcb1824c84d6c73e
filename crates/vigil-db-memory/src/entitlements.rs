use std::collections::HashSet;

use async_trait::async_trait;

use vigil_storage::{EntitlementChecker, Feature, Recipient};

/// Fixed entitlement policy: a feature set granted to everyone, minus
/// an explicit per-recipient deny list. Stands in for the billing
/// system's entitlement service.
#[derive(Debug, Default)]
pub struct StaticEntitlements {
    granted: HashSet<Feature>,
    denied_recipients: HashSet<String>,
}

impl StaticEntitlements {
    /// Every feature for every active recipient.
    pub fn allow_all() -> Self {
        Self {
            granted: [
                Feature::Notifications,
                Feature::SmsChannel,
                Feature::VoiceChannel,
                Feature::History,
            ]
            .into_iter()
            .collect(),
            denied_recipients: HashSet::new(),
        }
    }

    pub fn with_features(features: impl IntoIterator<Item = Feature>) -> Self {
        Self {
            granted: features.into_iter().collect(),
            denied_recipients: HashSet::new(),
        }
    }

    /// Deny every feature for one recipient, regardless of the grant
    /// set.
    pub fn deny_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.denied_recipients.insert(recipient_id.into());
        self
    }
}

#[async_trait]
impl EntitlementChecker for StaticEntitlements {
    async fn permits(&self, recipient: &Recipient, feature: Feature) -> bool {
        if !recipient.is_active || self.denied_recipients.contains(&recipient.id) {
            return false;
        }
        self.granted.contains(&feature)
    }
}
