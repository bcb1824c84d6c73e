//! Periodic multi-source sync loop.
//!
//! Two states: idle between cycles, syncing while one is in flight.
//! A cycle runs every adapter concurrently, each bounded by a timeout
//! so a hung feed can never wedge the loop, then sweeps expired
//! alerts. Adapter failures are logged and counted, never propagated.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{Notify, watch};
use tokio::time::{Instant, interval_at};
use tracing::{error, info, warn};

use crate::adapter::{SourceAdapter, SyncContext};
use crate::error::SourceError;

#[derive(Debug, Clone, Copy)]
pub struct SyncSchedulerConfig {
    /// Sleep between cycles.
    pub interval: Duration,
    /// Upper bound on a single adapter's sync call.
    pub adapter_timeout: Duration,
    /// How long shutdown waits for an in-flight cycle before
    /// abandoning it.
    pub shutdown_grace: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            adapter_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Syncing,
}

/// What one full cycle accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub expired: u64,
}

/// Cheap clone handed to the admin surface.
#[derive(Clone)]
pub struct SchedulerHandle {
    force: Arc<Notify>,
    syncing: Arc<AtomicBool>,
}

impl SchedulerHandle {
    /// Trigger an out-of-band pass without disturbing the timer.
    pub fn force_sync(&self) {
        self.force.notify_one();
    }

    pub fn state(&self) -> SchedulerState {
        if self.syncing.load(Ordering::SeqCst) {
            SchedulerState::Syncing
        } else {
            SchedulerState::Idle
        }
    }
}

pub struct SyncScheduler {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    ctx: SyncContext,
    config: SyncSchedulerConfig,
    force: Arc<Notify>,
    syncing: Arc<AtomicBool>,
}

impl SyncScheduler {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        ctx: SyncContext,
        config: SyncSchedulerConfig,
    ) -> Self {
        Self {
            adapters,
            ctx,
            config,
            force: Arc::new(Notify::new()),
            syncing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            force: Arc::clone(&self.force),
            syncing: Arc::clone(&self.syncing),
        }
    }

    /// Run until `shutdown` flips to true. One synchronous pass fires
    /// immediately, then the interval loop takes over; `force_sync`
    /// inserts extra passes without resetting the timer.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            adapters = self.adapters.len(),
            interval_secs = self.config.interval.as_secs(),
            "sync scheduler started"
        );

        if self.cycle_or_shutdown(&mut shutdown).await {
            return;
        }

        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.cycle_or_shutdown(&mut shutdown).await {
                        return;
                    }
                }
                _ = self.force.notified() => {
                    info!("manual sync requested");
                    if self.cycle_or_shutdown(&mut shutdown).await {
                        return;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("sync scheduler stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Run a cycle, racing it against the shutdown signal. Returns
    /// true when shutdown was requested; the in-flight cycle gets the
    /// configured grace period to finish before being abandoned.
    async fn cycle_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let cycle = self.run_cycle();
        tokio::pin!(cycle);

        tokio::select! {
            _ = &mut cycle => false,
            changed = shutdown.changed() => {
                let requested = changed.is_err() || *shutdown.borrow();
                if requested {
                    if tokio::time::timeout(self.config.shutdown_grace, &mut cycle)
                        .await
                        .is_err()
                    {
                        warn!("abandoning in-flight sync cycle at shutdown");
                        self.syncing.store(false, Ordering::SeqCst);
                    }
                    info!("sync scheduler stopping");
                } else {
                    // Spurious watch wakeup; let the cycle finish.
                    cycle.await;
                }
                requested
            }
        }
    }

    /// One full pass: every adapter concurrently, then the expiry
    /// sweep once all upserts have landed.
    pub async fn run_cycle(&self) -> CycleSummary {
        self.syncing.store(true, Ordering::SeqCst);

        let timeout_secs = self.config.adapter_timeout.as_secs();
        let syncs = self.adapters.iter().map(|adapter| {
            let ctx = self.ctx.clone();
            async move {
                let result =
                    match tokio::time::timeout(self.config.adapter_timeout, adapter.sync(&ctx))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout(timeout_secs)),
                    };
                (adapter.name(), result)
            }
        });

        let mut summary = CycleSummary::default();
        for (name, result) in join_all(syncs).await {
            match result {
                Ok(_) => summary.succeeded += 1,
                Err(err) => {
                    summary.failed += 1;
                    warn!(source = name, error = %err, "adapter sync failed");
                }
            }
        }

        match self.ctx.alerts.mark_expired(vigil_core::now_utc()).await {
            Ok(expired) => {
                summary.expired = expired;
                if expired > 0 {
                    info!(expired, "expiry sweep flipped alerts inactive");
                }
            }
            Err(err) => error!(error = %err, "expiry sweep failed"),
        }

        self.syncing.store(false, Ordering::SeqCst);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::AtomicU64;
    use time::Duration as TimeDuration;
    use time::macros::datetime;
    use vigil_core::{Alert, AlertBroadcaster, Category, Severity};
    use vigil_db_memory::InMemoryAlertStore;
    use vigil_storage::AlertStore;

    struct StubAdapter {
        name: &'static str,
        fail: bool,
        delay: Duration,
        calls: AtomicU64,
    }

    impl StubAdapter {
        fn ok(name: &'static str) -> Self {
            Self {
                name,
                fail: false,
                delay: Duration::ZERO,
                calls: AtomicU64::new(0),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                fail: true,
                ..Self::ok(name)
            }
        }

        fn hanging(name: &'static str, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::ok(name)
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(SourceError::malformed("stub failure"));
            }
            Ok(vec![json!({"id": 1})])
        }

        fn convert(&self, raw: &[Value]) -> Vec<Alert> {
            raw.iter()
                .map(|_| {
                    Alert::new(
                        format!("{}_1", self.name),
                        "Stub",
                        "Stub",
                        Severity::Minor,
                        Category::Other,
                        datetime!(2025-06-01 00:00:00 UTC),
                        self.name,
                    )
                })
                .collect()
        }
    }

    fn context(store: Arc<InMemoryAlertStore>) -> SyncContext {
        SyncContext::new(store, AlertBroadcaster::new())
    }

    #[tokio::test]
    async fn failing_adapter_does_not_cancel_siblings() {
        let store = Arc::new(InMemoryAlertStore::new());
        let scheduler = SyncScheduler::new(
            vec![
                Arc::new(StubAdapter::failing("bad")),
                Arc::new(StubAdapter::ok("good")),
            ],
            context(store.clone()),
            SyncSchedulerConfig::default(),
        );

        let summary = scheduler.run_cycle().await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(store.get_by_external_id("good_1").await.unwrap().is_some());
        assert_eq!(scheduler.handle().state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn hanging_adapter_is_bounded_by_timeout() {
        let store = Arc::new(InMemoryAlertStore::new());
        let config = SyncSchedulerConfig {
            adapter_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let scheduler = SyncScheduler::new(
            vec![
                Arc::new(StubAdapter::hanging("slow", Duration::from_secs(30))),
                Arc::new(StubAdapter::ok("fast")),
            ],
            context(store.clone()),
            config,
        );

        let summary =
            tokio::time::timeout(Duration::from_secs(5), scheduler.run_cycle())
                .await
                .expect("cycle must not hang");
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(store.get_by_external_id("fast_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expiry_sweep_runs_after_upserts() {
        let store = Arc::new(InMemoryAlertStore::new());
        let mut stale = Alert::new(
            "stale_1",
            "Stale",
            "Stale",
            Severity::Minor,
            Category::Other,
            datetime!(2025-06-01 00:00:00 UTC),
            "test",
        );
        stale.expires_time = Some(vigil_core::now_utc() - TimeDuration::hours(1));
        store.upsert_by_external_id(stale).await.unwrap();

        let scheduler = SyncScheduler::new(
            vec![Arc::new(StubAdapter::ok("live"))],
            context(store.clone()),
            SyncSchedulerConfig::default(),
        );

        let summary = scheduler.run_cycle().await;
        assert_eq!(summary.expired, 1);
        let stale = store.get_by_external_id("stale_1").await.unwrap().unwrap();
        assert!(!stale.is_active);
    }

    #[tokio::test]
    async fn force_sync_triggers_out_of_band_pass() {
        let store = Arc::new(InMemoryAlertStore::new());
        let adapter = Arc::new(StubAdapter::ok("forced"));
        let config = SyncSchedulerConfig {
            interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let scheduler = SyncScheduler::new(vec![adapter.clone()], context(store.clone()), config);
        let handle = scheduler.handle();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(scheduler.run(shutdown_rx));

        // Wait for the immediate startup pass.
        tokio::time::timeout(Duration::from_secs(5), async {
            while adapter.calls.load(Ordering::SeqCst) < 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("startup pass");

        handle.force_sync();
        tokio::time::timeout(Duration::from_secs(5), async {
            while adapter.calls.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("forced pass ran without waiting for the interval");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("scheduler exits on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_exits_promptly_while_idle() {
        let store = Arc::new(InMemoryAlertStore::new());
        let scheduler = SyncScheduler::new(
            vec![Arc::new(StubAdapter::ok("only"))],
            context(store),
            SyncSchedulerConfig {
                interval: Duration::from_secs(3600),
                ..Default::default()
            },
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(scheduler.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("prompt exit")
            .unwrap();
    }
}
