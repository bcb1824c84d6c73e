use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use time::UtcOffset;
use time::macros::offset;
use tokio::sync::watch;

use vigil_config::VigilConfig;
use vigil_core::AlertBroadcaster;
use vigil_db_memory::{
    InMemoryAlertStore, InMemoryChannelStore, InMemoryDeliveryStore, InMemoryRecipientStore,
    InMemoryZoneStore, StaticEntitlements,
};
use vigil_dispatch::senders::email::{EmailSender, EmailSenderConfig};
use vigil_dispatch::senders::sms::{SmsSender, SmsSenderConfig};
use vigil_dispatch::senders::voice::{VoiceSender, VoiceSenderConfig};
use vigil_dispatch::{ChannelSender, DispatchQueue, Dispatcher, DispatcherConfig};
use vigil_realtime::ConnectionManager;
use vigil_server::{AppState, ServerBuilder, fanout, observability, server};
use vigil_sources::{
    CrimeAdapter, SeismicAdapter, SourceAdapter, SyncContext, SyncScheduler, SyncSchedulerConfig,
    VolcanoAdapter, WeatherAdapter, crime, seismic, volcano, weather,
};
use vigil_storage::{
    AlertStore, ChannelStore, DeliveryStore, EntitlementChecker, RecipientStore, ZoneStore,
};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From VIGIL_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (vigil.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (VIGIL_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present so provider credentials can come from it in
    // local development.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = match VigilConfig::load(Some(config_path.as_path())) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(path = %config_path.display(), source = %source, "configuration loaded");

    // Storage: the in-memory profile. A database-backed profile plugs
    // in behind the same traits.
    let alerts: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
    let recipients: Arc<dyn RecipientStore> = Arc::new(InMemoryRecipientStore::new());
    let zones: Arc<dyn ZoneStore> = Arc::new(InMemoryZoneStore::new());
    let channels: Arc<dyn ChannelStore> = Arc::new(InMemoryChannelStore::new());
    let deliveries: Arc<dyn DeliveryStore> = Arc::new(InMemoryDeliveryStore::new());
    let entitlements: Arc<dyn EntitlementChecker> = Arc::new(StaticEntitlements::allow_all());

    let events = AlertBroadcaster::new();
    let manager = ConnectionManager::new_shared();

    let dispatcher = Arc::new(Dispatcher::new(
        recipients,
        zones,
        channels,
        entitlements,
        deliveries.clone(),
        build_senders(&cfg),
        DispatcherConfig {
            quiet_hours_offset: UtcOffset::from_hms(cfg.dispatch.quiet_hours_offset_hours, 0, 0)
                .unwrap_or(offset!(-10)),
        },
    ));
    let queue = DispatchQueue::start(dispatcher, cfg.dispatch.queue_capacity);

    let scheduler = SyncScheduler::new(
        build_adapters(&cfg),
        SyncContext::new(alerts.clone(), events.clone()),
        SyncSchedulerConfig {
            interval: Duration::from_secs(cfg.sync.interval_secs),
            adapter_timeout: Duration::from_secs(cfg.sync.adapter_timeout_secs),
            shutdown_grace: Duration::from_secs(cfg.sync.shutdown_grace_secs),
        },
    );
    let scheduler_handle = scheduler.handle();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let fanout_task = fanout::spawn(
        events.clone(),
        Arc::clone(&manager),
        queue.sender(),
        shutdown_rx,
    );

    let state = AppState {
        config: Arc::new(cfg),
        manager,
        alerts,
        deliveries,
        events,
        scheduler: scheduler_handle,
        dispatch: queue.sender(),
    };

    let vigil = ServerBuilder::new(state).build();
    if let Err(err) = vigil.run(server::shutdown_signal()).await {
        eprintln!("Server error: {err}");
    }

    // Ordered teardown: stop the background loops, then drain the
    // dispatch queue so in-flight sends complete.
    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(30), scheduler_task).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), fanout_task).await;
    queue.shutdown().await;
    tracing::info!("shutdown complete");
}

fn build_senders(cfg: &VigilConfig) -> Vec<Arc<dyn ChannelSender>> {
    let mut senders: Vec<Arc<dyn ChannelSender>> = Vec::new();

    if cfg.dispatch.email.api_key.is_empty() {
        tracing::warn!("email provider not configured; email sends disabled");
    } else {
        senders.push(Arc::new(EmailSender::new(EmailSenderConfig {
            api_key: cfg.dispatch.email.api_key.clone(),
            from_email: cfg.dispatch.email.from_email.clone(),
            from_name: cfg.dispatch.email.from_name.clone(),
            base_url: cfg
                .dispatch
                .email
                .base_url
                .clone()
                .unwrap_or_else(|| email_default_url()),
        })));
    }

    let sms = &cfg.dispatch.sms;
    if sms.account_sid.is_empty() || sms.auth_token.is_empty() {
        tracing::warn!("sms provider not configured; sms and voice sends disabled");
    } else {
        let base_url = sms
            .base_url
            .clone()
            .unwrap_or_else(|| vigil_dispatch::senders::sms::DEFAULT_BASE_URL.to_string());
        senders.push(Arc::new(SmsSender::new(SmsSenderConfig {
            account_sid: sms.account_sid.clone(),
            auth_token: sms.auth_token.clone(),
            from_number: sms.from_number.clone(),
            base_url: base_url.clone(),
        })));
        senders.push(Arc::new(VoiceSender::new(VoiceSenderConfig {
            account_sid: sms.account_sid.clone(),
            auth_token: sms.auth_token.clone(),
            from_number: sms.from_number.clone(),
            base_url,
        })));
    }

    senders
}

fn email_default_url() -> String {
    vigil_dispatch::senders::email::DEFAULT_BASE_URL.to_string()
}

fn build_adapters(cfg: &VigilConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let sources = &cfg.sources;
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if sources.weather_enabled {
        adapters.push(Arc::new(WeatherAdapter::new(
            sources
                .weather_base_url
                .clone()
                .unwrap_or_else(|| weather::DEFAULT_BASE_URL.to_string()),
            sources.weather_area.clone(),
        )));
    }
    let seismic_url = sources
        .seismic_base_url
        .clone()
        .unwrap_or_else(|| seismic::DEFAULT_BASE_URL.to_string());
    if sources.seismic_enabled {
        adapters.push(Arc::new(SeismicAdapter::new(
            seismic_url.clone(),
            seismic::BoundingBox::hawaii(),
        )));
    }
    if sources.volcano_enabled {
        adapters.push(Arc::new(VolcanoAdapter::new(
            sources
                .volcano_base_url
                .clone()
                .unwrap_or_else(|| volcano::DEFAULT_BASE_URL.to_string()),
            seismic_url,
        )));
    }
    if sources.crime_enabled {
        adapters.push(Arc::new(CrimeAdapter::new(
            sources
                .crime_base_url
                .clone()
                .unwrap_or_else(|| crime::DEFAULT_BASE_URL.to_string()),
        )));
    }

    if adapters.is_empty() {
        tracing::warn!("no source adapters enabled; ingestion will be idle");
    }
    adapters
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: VIGIL_CONFIG
/// 3. Default: vigil.toml
fn resolve_config_path() -> (PathBuf, ConfigSource) {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (PathBuf::from(path), ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = std::env::var("VIGIL_CONFIG")
        && !path.is_empty()
    {
        return (PathBuf::from(path), ConfigSource::EnvironmentVariable);
    }

    (PathBuf::from("vigil.toml"), ConfigSource::Default)
}
