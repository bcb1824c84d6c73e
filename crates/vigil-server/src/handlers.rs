//! HTTP handlers: service info, health, and the thin admin surface
//! over the engine (stats, force-sync, test alerts).

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use time::Duration;
use uuid::Uuid;

use vigil_core::{Alert, AlertEvent, Category, Severity, format_rfc3339, now_utc};
use vigil_geo::GeoPolygon;
use vigil_sources::SchedulerState;

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "Vigil Alert Hub",
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": format_rfc3339(now_utc()),
    }))
}

pub async fn healthz(State(state): State<AppState>) -> Json<Value> {
    // The alert store is the only fatal dependency.
    let storage = match state.alerts.list_active(now_utc()).await {
        Ok(_) => "operational",
        Err(_) => "unavailable",
    };
    Json(json!({
        "status": if storage == "operational" { "healthy" } else { "degraded" },
        "timestamp": format_rfc3339(now_utc()),
        "services": {
            "storage": storage,
            "websocket": "operational",
        },
    }))
}

/// Aggregate stats for dashboards: live connections, delivery
/// counters, scheduler state.
pub async fn admin_stats(State(state): State<AppState>) -> Json<Value> {
    let deliveries = state.deliveries.stats().await.unwrap_or_default();
    let scheduler = match state.scheduler.state() {
        SchedulerState::Idle => "idle",
        SchedulerState::Syncing => "syncing",
    };
    Json(json!({
        "connections": state.manager.stats(),
        "deliveries": deliveries,
        "scheduler": scheduler,
    }))
}

/// Trigger an immediate ingestion pass.
pub async fn force_sync(State(state): State<AppState>) -> Json<Value> {
    state.scheduler.force_sync();
    Json(json!({
        "status": "sync_triggered",
        "timestamp": format_rfc3339(now_utc()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: Category,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub polygon: Option<GeoPolygon>,
    #[serde(default)]
    pub affected_regions: Vec<String>,
    #[serde(default)]
    pub expires_minutes: Option<i64>,
    /// Test alerts exercise the full fanout path.
    #[serde(default)]
    pub is_test: bool,
}

/// Admin-created alert. Stored like any feed alert and pushed through
/// the same dispatch and broadcast path.
pub async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Alert>), (StatusCode, Json<Value>)> {
    let now = now_utc();
    let mut alert = Alert::new(
        format!("admin_{}", Uuid::new_v4()),
        request.title,
        request.description,
        request.severity,
        request.category,
        now,
        "Vigil Operations",
    );
    alert.location_name = request.location_name;
    alert.latitude = request.latitude;
    alert.longitude = request.longitude;
    alert.radius_miles = request.radius_miles;
    alert.polygon = request.polygon;
    alert.affected_regions = request.affected_regions;
    alert.expires_time = request.expires_minutes.map(|m| now + Duration::minutes(m));
    alert.is_test = request.is_test;

    match state.alerts.upsert_by_external_id(alert).await {
        Ok((stored, _)) => {
            state.events.send(AlertEvent::created(stored.clone()));
            Ok((StatusCode::CREATED, Json(stored)))
        }
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        )),
    }
}

/// Active alerts, for client bootstrap before the socket is up.
pub async fn active_alerts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Alert>>, (StatusCode, Json<Value>)> {
    state
        .alerts
        .list_active(now_utc())
        .await
        .map(Json)
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
        })
}
