use std::sync::Arc;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use time::OffsetDateTime;

use vigil_core::Alert;
use vigil_storage::{AlertStore, StorageError, UpsertOutcome};

/// In-memory alert table keyed by canonical external id, with an id
/// index for primary-key reads.
///
/// Per-id last-writer-wins is the accepted upsert semantic here:
/// concurrent syncs of the same external id converge on one row.
#[derive(Debug)]
pub struct InMemoryAlertStore {
    by_external: Arc<PapayaHashMap<String, Alert>>,
    id_index: Arc<PapayaHashMap<String, String>>,
}

impl Default for InMemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self {
            by_external: Arc::new(PapayaHashMap::new()),
            id_index: Arc::new(PapayaHashMap::new()),
        }
    }

    /// Total rows, active or not.
    pub fn len(&self) -> usize {
        self.by_external.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn upsert_by_external_id(
        &self,
        incoming: Alert,
    ) -> Result<(Alert, UpsertOutcome), StorageError> {
        let now = OffsetDateTime::now_utc();
        let guard = self.by_external.pin();

        match guard.get(&incoming.external_id) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.apply_update(&incoming, now);
                guard.insert(incoming.external_id.clone(), updated.clone());
                Ok((updated, UpsertOutcome::Updated))
            }
            None => {
                self.id_index
                    .pin()
                    .insert(incoming.id.clone(), incoming.external_id.clone());
                guard.insert(incoming.external_id.clone(), incoming.clone());
                Ok((incoming, UpsertOutcome::Created))
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Alert>, StorageError> {
        let index = self.id_index.pin();
        let Some(external_id) = index.get(id) else {
            return Ok(None);
        };
        Ok(self.by_external.pin().get(external_id).cloned())
    }

    async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Alert>, StorageError> {
        Ok(self.by_external.pin().get(external_id).cloned())
    }

    async fn list_active(&self, now: OffsetDateTime) -> Result<Vec<Alert>, StorageError> {
        let guard = self.by_external.pin();
        Ok(guard
            .iter()
            .filter(|(_, alert)| alert.is_active && !alert.is_expired(now))
            .map(|(_, alert)| alert.clone())
            .collect())
    }

    async fn mark_expired(&self, now: OffsetDateTime) -> Result<u64, StorageError> {
        let guard = self.by_external.pin();
        let expired: Vec<Alert> = guard
            .iter()
            .filter(|(_, alert)| alert.is_active && alert.is_expired(now))
            .map(|(_, alert)| alert.clone())
            .collect();

        let count = expired.len() as u64;
        for mut alert in expired {
            alert.is_active = false;
            alert.updated_at = now;
            guard.insert(alert.external_id.clone(), alert);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::datetime;
    use vigil_core::{Category, Severity};

    fn sample(external_id: &str) -> Alert {
        Alert::new(
            external_id,
            "Test Alert",
            "Test description",
            Severity::Moderate,
            Category::Weather,
            datetime!(2025-06-01 00:00:00 UTC),
            "Test Source",
        )
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_external_id() {
        let store = InMemoryAlertStore::new();

        let (first, outcome) = store.upsert_by_external_id(sample("nws_1")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let mut second = sample("nws_1");
        second.title = "Updated title".into();
        second.severity = Severity::Severe;
        let (stored, outcome) = store.upsert_by_external_id(second).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(store.len(), 1);
        // Identity survives; the second sync's fields win.
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.title, "Updated title");
        assert_eq!(stored.severity, Severity::Severe);
    }

    #[tokio::test]
    async fn get_by_primary_id_after_update() {
        let store = InMemoryAlertStore::new();
        let (created, _) = store.upsert_by_external_id(sample("usgs_eq_9")).await.unwrap();

        let mut update = sample("usgs_eq_9");
        update.title = "M5 Earthquake".into();
        store.upsert_by_external_id(update).await.unwrap();

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "M5 Earthquake");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expiry_sweep_flips_only_past_expiries() {
        let store = InMemoryAlertStore::new();
        let now = datetime!(2025-06-02 12:00:00 UTC);

        let mut past = sample("a_past");
        past.expires_time = Some(now - Duration::hours(1));
        let mut future = sample("b_future");
        future.expires_time = Some(now + Duration::hours(1));
        let never = sample("c_never");

        store.upsert_by_external_id(past).await.unwrap();
        store.upsert_by_external_id(future).await.unwrap();
        store.upsert_by_external_id(never).await.unwrap();

        let flipped = store.mark_expired(now).await.unwrap();
        assert_eq!(flipped, 1);

        let expired = store.get_by_external_id("a_past").await.unwrap().unwrap();
        assert!(!expired.is_active);

        let active = store.list_active(now).await.unwrap();
        let mut ids: Vec<_> = active.iter().map(|a| a.external_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["b_future", "c_never"]);

        // A second sweep is a no-op.
        assert_eq!(store.mark_expired(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_upserts_converge_to_one_row() {
        let store = Arc::new(InMemoryAlertStore::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut alert = sample("race_1");
                alert.title = format!("writer {i}");
                store.upsert_by_external_id(alert).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 1);
    }
}
