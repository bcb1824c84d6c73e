use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use vigil_core::{AlertBroadcaster, AlertEvent};
use vigil_storage::{AlertStore, UpsertOutcome};

use crate::error::SourceError;

/// Shared collaborators handed to every adapter sync.
#[derive(Clone)]
pub struct SyncContext {
    pub alerts: Arc<dyn AlertStore>,
    pub events: AlertBroadcaster,
}

impl SyncContext {
    pub fn new(alerts: Arc<dyn AlertStore>, events: AlertBroadcaster) -> Self {
        Self { alerts, events }
    }
}

/// What one adapter sync accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub fetched: usize,
    pub converted: usize,
    pub created: u64,
    pub updated: u64,
}

/// One external feed.
///
/// `fetch` performs the outbound call; `convert` maps raw records to
/// canonical alerts, skipping (and logging) records it cannot parse
/// rather than failing the batch. The provided `sync` composes the
/// two and upserts by canonical external id, publishing a lifecycle
/// event per row touched.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable feed name, also the prefix of this feed's external ids.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<serde_json::Value>, SourceError>;

    fn convert(&self, raw: &[serde_json::Value]) -> Vec<vigil_core::Alert>;

    async fn sync(&self, ctx: &SyncContext) -> Result<SyncSummary, SourceError> {
        let raw = self.fetch().await?;
        let alerts = self.convert(&raw);

        let mut summary = SyncSummary {
            fetched: raw.len(),
            converted: alerts.len(),
            ..Default::default()
        };

        for alert in alerts {
            let (stored, outcome) = ctx.alerts.upsert_by_external_id(alert).await?;
            match outcome {
                UpsertOutcome::Created => {
                    summary.created += 1;
                    debug!(source = self.name(), external_id = %stored.external_id, "new alert");
                    ctx.events.send(AlertEvent::created(stored));
                }
                UpsertOutcome::Updated => {
                    summary.updated += 1;
                    ctx.events.send(AlertEvent::updated(stored));
                }
            }
        }

        info!(
            source = self.name(),
            fetched = summary.fetched,
            converted = summary.converted,
            created = summary.created,
            updated = summary.updated,
            "sync complete"
        );
        Ok(summary)
    }
}
