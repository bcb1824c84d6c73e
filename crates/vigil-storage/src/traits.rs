//! Contracts between the engine and its persistence collaborators.
//!
//! The stores do attribute filtering (active flags, region membership);
//! the engine does all geometric reasoning on what comes back.

use async_trait::async_trait;
use time::OffsetDateTime;
use vigil_core::Alert;

use crate::error::StorageError;
use crate::types::{
    DeliveryRecord, DeliveryStats, Feature, NotificationChannel, Recipient, UpsertOutcome, Zone,
};

/// System of record for alerts: dedup and expiry state live here.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert or overwrite the row for `incoming.external_id`.
    ///
    /// On update, identity (`id`, `created_at`) is preserved and
    /// mutable fields are overwritten with a fresh `updated_at`.
    /// Must be upsert-atomic per external id so concurrent adapter
    /// syncs cannot produce duplicate rows.
    async fn upsert_by_external_id(
        &self,
        incoming: Alert,
    ) -> Result<(Alert, UpsertOutcome), StorageError>;

    async fn get(&self, id: &str) -> Result<Option<Alert>, StorageError>;

    async fn get_by_external_id(&self, external_id: &str)
    -> Result<Option<Alert>, StorageError>;

    /// Active alerts that have not expired as of `now`.
    async fn list_active(&self, now: OffsetDateTime) -> Result<Vec<Alert>, StorageError>;

    /// Flip alerts past their expiry to inactive. Returns how many
    /// rows changed. Alerts without an expiry are never touched.
    async fn mark_expired(&self, now: OffsetDateTime) -> Result<u64, StorageError>;
}

/// Read-only recipient queries. The store filters attributes; callers
/// apply the geometry.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Recipient>, StorageError>;

    /// Active recipients with a known home location.
    async fn active_with_home(&self) -> Result<Vec<Recipient>, StorageError>;

    /// Active recipients subscribed to at least one of `regions`.
    async fn active_in_regions(&self, regions: &[String])
    -> Result<Vec<Recipient>, StorageError>;
}

/// Read-only zone queries.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn active_zones(&self) -> Result<Vec<Zone>, StorageError>;
}

/// Read-only channel queries.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Channels eligible for sends: active and verified.
    async fn active_verified(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<NotificationChannel>, StorageError>;
}

/// Write side of delivery outcomes.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn record(&self, record: DeliveryRecord) -> Result<(), StorageError>;

    /// Aggregate counters for admin dashboards.
    async fn stats(&self) -> Result<DeliveryStats, StorageError>;
}

/// Subscription entitlement checks.
#[async_trait]
pub trait EntitlementChecker: Send + Sync {
    async fn permits(&self, recipient: &Recipient, feature: Feature) -> bool;
}
