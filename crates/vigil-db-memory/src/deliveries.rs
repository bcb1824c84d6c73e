use async_trait::async_trait;
use tokio::sync::Mutex;

use vigil_storage::{DeliveryRecord, DeliveryStats, DeliveryStatus, DeliveryStore, StorageError};

/// Append-only delivery log with aggregate counters.
#[derive(Debug, Default)]
pub struct InMemoryDeliveryStore {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded outcome, for tests and dashboards.
    pub async fn records(&self) -> Vec<DeliveryRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn record(&self, record: DeliveryRecord) -> Result<(), StorageError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn stats(&self) -> Result<DeliveryStats, StorageError> {
        let records = self.records.lock().await;
        let mut stats = DeliveryStats::default();
        for record in records.iter() {
            match record.status {
                DeliveryStatus::Sent => stats.sent += 1,
                DeliveryStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use vigil_storage::{ChannelKind, NotificationChannel};

    #[tokio::test]
    async fn stats_count_by_status() {
        let store = InMemoryDeliveryStore::new();
        let channel = NotificationChannel::new("r1", ChannelKind::Email, "a@b.c");
        let at = datetime!(2025-06-01 00:00:00 UTC);

        store
            .record(DeliveryRecord::new(
                "alert-1", "r1", &channel, DeliveryStatus::Sent, None, at,
            ))
            .await
            .unwrap();
        store
            .record(DeliveryRecord::new(
                "alert-1",
                "r1",
                &channel,
                DeliveryStatus::Failed,
                Some("provider 500".into()),
                at,
            ))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(store.records().await.len(), 2);
    }
}
