//! Admin surface integration tests against the assembled router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use vigil_config::VigilConfig;
use vigil_core::AlertBroadcaster;
use vigil_db_memory::{
    InMemoryAlertStore, InMemoryChannelStore, InMemoryDeliveryStore, InMemoryRecipientStore,
    InMemoryZoneStore, StaticEntitlements,
};
use vigil_dispatch::{DispatchQueue, Dispatcher, DispatcherConfig};
use vigil_realtime::ConnectionManager;
use vigil_server::{AppState, build_app};
use vigil_sources::{SyncContext, SyncScheduler, SyncSchedulerConfig};
use vigil_storage::AlertStore;

fn test_state() -> (AppState, Arc<InMemoryAlertStore>) {
    let alerts = Arc::new(InMemoryAlertStore::new());
    let deliveries = Arc::new(InMemoryDeliveryStore::new());
    let events = AlertBroadcaster::new();

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(InMemoryRecipientStore::new()),
        Arc::new(InMemoryZoneStore::new()),
        Arc::new(InMemoryChannelStore::new()),
        Arc::new(StaticEntitlements::allow_all()),
        deliveries.clone(),
        Vec::new(),
        DispatcherConfig::default(),
    ));
    let queue = DispatchQueue::start(dispatcher, 8);

    // A scheduler that is never run; the admin surface only needs its
    // handle.
    let scheduler = SyncScheduler::new(
        Vec::new(),
        SyncContext::new(alerts.clone(), events.clone()),
        SyncSchedulerConfig {
            interval: Duration::from_secs(3600),
            ..Default::default()
        },
    );

    let state = AppState {
        config: Arc::new(VigilConfig::default()),
        manager: ConnectionManager::new_shared(),
        alerts: alerts.clone(),
        deliveries,
        events,
        scheduler: scheduler.handle(),
        dispatch: queue.sender(),
    };
    (state, alerts)
}

fn app() -> (Router, Arc<InMemoryAlertStore>) {
    let (state, alerts) = test_state();
    (build_app(state), alerts)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_reports_service_info() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["service"], "Vigil Alert Hub");
    assert_eq!(body["status"], "operational");
}

#[tokio::test]
async fn health_reports_operational_storage() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["storage"], "operational");
}

#[tokio::test]
async fn created_alert_is_stored_and_listed() {
    let (app, alerts) = app();

    let request = Request::post("/api/v1/admin/alerts")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "title": "Drill",
                "description": "Monthly siren test",
                "severity": "minor",
                "category": "civil",
                "affected_regions": ["Honolulu County"],
                "is_test": true,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["title"], "Drill");
    assert_eq!(created["is_test"], true);
    assert!(
        created["external_id"]
            .as_str()
            .unwrap()
            .starts_with("admin_")
    );

    let stored = alerts
        .list_active(vigil_core::now_utc())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);

    let response = app
        .oneshot(Request::get("/api/v1/alerts").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn force_sync_and_stats_respond() {
    let (app, _) = app();

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/admin/sync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "sync_triggered");

    let response = app
        .oneshot(
            Request::get("/api/v1/admin/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["scheduler"], "idle");
    assert_eq!(body["connections"]["active_connections"], 0);
}
