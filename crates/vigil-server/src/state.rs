use std::sync::Arc;

use vigil_config::VigilConfig;
use vigil_core::AlertBroadcaster;
use vigil_dispatch::DispatchSender;
use vigil_realtime::ConnectionManager;
use vigil_sources::SchedulerHandle;
use vigil_storage::{AlertStore, DeliveryStore};

/// Shared server state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VigilConfig>,
    pub manager: Arc<ConnectionManager>,
    pub alerts: Arc<dyn AlertStore>,
    pub deliveries: Arc<dyn DeliveryStore>,
    pub events: AlertBroadcaster,
    pub scheduler: SchedulerHandle,
    pub dispatch: DispatchSender,
}
