use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;
use crate::ws;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/v1/alerts", get(handlers::active_alerts))
        .route("/api/v1/admin/stats", get(handlers::admin_stats))
        .route("/api/v1/admin/sync", post(handlers::force_sync))
        .route("/api/v1/admin/alerts", post(handlers::create_alert))
        .route("/ws/alerts/{recipient_id}", get(ws::client_socket))
        .route("/ws/admin/{admin_id}", get(ws::admin_socket))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct VigilServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    state: AppState,
}

impl ServerBuilder {
    pub fn new(state: AppState) -> Self {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = state
            .config
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let addr = SocketAddr::new(host, state.config.server.port);
        Self { addr, state }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn build(self) -> VigilServer {
        VigilServer {
            addr: self.addr,
            app: build_app(self.state),
        }
    }
}

impl VigilServer {
    /// Serve until the shutdown future resolves.
    pub async fn run(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
