//! Bounded dispatch queue.
//!
//! Alert events are enqueued here and drained by a single worker, so
//! dispatch completion is observable and shutdown can wait for
//! in-flight sends instead of abandoning fire-and-forget tasks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vigil_core::Alert;

use crate::engine::Dispatcher;

pub struct DispatchQueue {
    tx: mpsc::Sender<Alert>,
    worker: JoinHandle<()>,
}

/// Cheap cloneable enqueue handle, for callers that do not own the
/// queue's lifecycle.
#[derive(Clone)]
pub struct DispatchSender {
    tx: mpsc::Sender<Alert>,
}

impl DispatchSender {
    pub async fn enqueue(&self, alert: Alert) {
        if self.tx.send(alert).await.is_err() {
            warn!("dispatch queue closed, dropping alert");
        }
    }
}

impl DispatchQueue {
    /// Spawn the worker. `capacity` bounds how many alerts can wait;
    /// enqueueing past it applies backpressure to the caller.
    pub fn start(dispatcher: Arc<Dispatcher>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Alert>(capacity);

        let worker = tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                let report = dispatcher.dispatch(&alert).await;
                info!(
                    alert_id = %report.alert_id,
                    candidates = report.candidates,
                    eligible = report.eligible,
                    sent = report.sent(),
                    failed = report.failed(),
                    "dispatched alert"
                );
            }
            info!("dispatch queue drained");
        });

        Self { tx, worker }
    }

    pub async fn enqueue(&self, alert: Alert) {
        if self.tx.send(alert).await.is_err() {
            warn!("dispatch queue closed, dropping alert");
        }
    }

    pub fn sender(&self) -> DispatchSender {
        DispatchSender {
            tx: self.tx.clone(),
        }
    }

    /// Close the queue and wait for the worker to finish everything
    /// already accepted.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(err) = self.worker.await {
            warn!(error = %err, "dispatch worker ended abnormally");
        }
    }
}
