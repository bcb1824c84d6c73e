//! Recipient, zone and channel directories.
//!
//! Plain read-mostly maps behind tokio RwLocks; the engine only ever
//! reads these, writers are the (out-of-scope) account layer and test
//! fixtures.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vigil_storage::{
    ChannelStore, NotificationChannel, Recipient, RecipientStore, StorageError, Zone, ZoneStore,
};

#[derive(Debug, Default)]
pub struct InMemoryRecipientStore {
    recipients: RwLock<HashMap<String, Recipient>>,
}

impl InMemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, recipient: Recipient) {
        self.recipients
            .write()
            .await
            .insert(recipient.id.clone(), recipient);
    }
}

#[async_trait]
impl RecipientStore for InMemoryRecipientStore {
    async fn get(&self, id: &str) -> Result<Option<Recipient>, StorageError> {
        Ok(self.recipients.read().await.get(id).cloned())
    }

    async fn active_with_home(&self) -> Result<Vec<Recipient>, StorageError> {
        Ok(self
            .recipients
            .read()
            .await
            .values()
            .filter(|r| r.is_active && r.home.is_some())
            .cloned()
            .collect())
    }

    async fn active_in_regions(
        &self,
        regions: &[String],
    ) -> Result<Vec<Recipient>, StorageError> {
        Ok(self
            .recipients
            .read()
            .await
            .values()
            .filter(|r| {
                r.is_active
                    && r.subscribed_regions
                        .iter()
                        .any(|region| regions.contains(region))
            })
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryZoneStore {
    zones: RwLock<Vec<Zone>>,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, zone: Zone) {
        self.zones.write().await.push(zone);
    }
}

#[async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn active_zones(&self) -> Result<Vec<Zone>, StorageError> {
        Ok(self
            .zones
            .read()
            .await
            .iter()
            .filter(|z| z.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryChannelStore {
    channels: RwLock<Vec<NotificationChannel>>,
}

impl InMemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, channel: NotificationChannel) {
        self.channels.write().await.push(channel);
    }
}

#[async_trait]
impl ChannelStore for InMemoryChannelStore {
    async fn active_verified(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<NotificationChannel>, StorageError> {
        Ok(self
            .channels
            .read()
            .await
            .iter()
            .filter(|c| c.recipient_id == recipient_id && c.is_active && c.is_verified)
            .cloned()
            .collect())
    }
}
