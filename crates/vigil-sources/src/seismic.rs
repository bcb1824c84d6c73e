//! Seismic events feed (USGS-style GeoJSON feeds).

use std::collections::HashMap;

use reqwest::Client;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use async_trait::async_trait;
use vigil_core::{Alert, Category, Severity};

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::region::{island_label, regions_for_point};

pub const DEFAULT_BASE_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Magnitudes below this are discarded as noise.
const MIN_MAGNITUDE: f64 = 2.5;

/// Feed windows fetched per sync: all magnitudes from the last hour,
/// M2.5+ from the last day.
const FEED_WINDOWS: &[(&str, &str)] = &[("all", "hour"), ("2.5", "day")];

/// Region bounding box used to filter the global feeds client-side.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn hawaii() -> Self {
        Self {
            min_latitude: 18.5,
            max_latitude: 22.5,
            min_longitude: -161.0,
            max_longitude: -154.5,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&lat)
            && (self.min_longitude..=self.max_longitude).contains(&lon)
    }
}

pub struct SeismicAdapter {
    client: Client,
    base_url: String,
    bounds: BoundingBox,
}

impl SeismicAdapter {
    pub fn new(base_url: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            bounds,
        }
    }
}

impl Default for SeismicAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, BoundingBox::hawaii())
    }
}

/// Fetch one summary feed and return its features. Shared with the
/// volcano adapter's swarm check.
pub(crate) async fn fetch_feed(
    client: &Client,
    base_url: &str,
    endpoint: &str,
    window: &str,
) -> Result<Vec<Value>, SourceError> {
    let url = format!(
        "{}/{endpoint}_{window}.geojson",
        base_url.trim_end_matches('/')
    );
    let response = client
        .get(&url)
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SourceError::Status {
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let body: Value = response.json().await?;
    match body.get("features").and_then(Value::as_array) {
        Some(features) => Ok(features.clone()),
        None => Err(SourceError::malformed("missing features array")),
    }
}

#[async_trait]
impl SourceAdapter for SeismicAdapter {
    fn name(&self) -> &'static str {
        "usgs"
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let mut quakes = Vec::new();
        let mut last_error = None;

        for (endpoint, window) in FEED_WINDOWS {
            match fetch_feed(&self.client, &self.base_url, endpoint, window).await {
                Ok(features) => {
                    // The summary feeds are global; keep only our region.
                    quakes.extend(features.into_iter().filter(|f| {
                        feature_coordinates(f)
                            .map(|(lat, lon, _)| self.bounds.contains(lat, lon))
                            .unwrap_or(false)
                    }));
                }
                Err(err) => {
                    warn!(source = "usgs", window, error = %err, "feed window failed");
                    last_error = Some(err);
                }
            }
        }

        // All windows failing is a feed outage; partial results are fine.
        if quakes.is_empty()
            && let Some(err) = last_error
        {
            return Err(err);
        }
        Ok(quakes)
    }

    fn convert(&self, raw: &[Value]) -> Vec<Alert> {
        let mut by_external_id: HashMap<String, Alert> = HashMap::new();

        for feature in raw {
            match convert_feature(feature) {
                Ok(Some(alert)) => {
                    // The hour and day windows overlap; last one wins.
                    by_external_id.insert(alert.external_id.clone(), alert);
                }
                Ok(None) => {}
                Err(reason) => {
                    warn!(source = "usgs", %reason, "skipping malformed record");
                }
            }
        }

        by_external_id.into_values().collect()
    }
}

fn feature_coordinates(feature: &Value) -> Option<(f64, f64, f64)> {
    let coords = feature
        .get("geometry")?
        .get("coordinates")?
        .as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    let depth = coords.get(2).and_then(Value::as_f64).unwrap_or(0.0);
    Some((lat, lon, depth))
}

fn convert_feature(feature: &Value) -> Result<Option<Alert>, String> {
    let props = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or("missing properties")?;
    let (lat, lon, depth) =
        feature_coordinates(feature).ok_or("missing coordinates")?;

    let magnitude = props.get("mag").and_then(Value::as_f64).unwrap_or(0.0);
    if magnitude < MIN_MAGNITUDE {
        return Ok(None);
    }

    let raw_id = props
        .get("code")
        .or_else(|| props.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or("missing event code")?;

    let event_time = props
        .get("time")
        .and_then(Value::as_i64)
        .and_then(|ms| OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).ok())
        .ok_or("missing event time")?;

    let place = props
        .get("place")
        .and_then(Value::as_str)
        .unwrap_or("Hawaii");
    let alert_level = props.get("alert").and_then(Value::as_str).unwrap_or("");
    let felt = props.get("felt").and_then(Value::as_u64).unwrap_or(0);

    let tsunami_note = if magnitude >= 7.0 && depth < 100.0 {
        "TSUNAMI POTENTIAL"
    } else {
        "No tsunami expected."
    };

    let mut alert = Alert::new(
        format!("usgs_eq_{raw_id}"),
        format!("M{magnitude} Earthquake - {place}"),
        format!(
            "A magnitude {magnitude} earthquake occurred at a depth of {depth:.1} km. \
             {} Felt reports: {felt}. {tsunami_note}",
            if alert_level.is_empty() {
                String::new()
            } else {
                format!("{} alert level.", alert_level.to_uppercase())
            }
        ),
        severity_for_magnitude(magnitude),
        Category::Earthquake,
        event_time,
        "USGS Earthquake Hazards Program",
    );
    alert.location_name = Some(format!("{place} - {}", island_label(lat, lon)));
    alert.latitude = Some(lat);
    alert.longitude = Some(lon);
    alert.radius_miles = Some(radius_for_magnitude(magnitude));
    alert.affected_regions = regions_for_point(lat, lon);
    alert.expires_time = Some(event_time + Duration::hours(expiry_hours(magnitude)));
    alert.source_url = props.get("url").and_then(Value::as_str).map(str::to_string);
    alert.metadata = serde_json::json!({
        "magnitude": magnitude,
        "depth_km": depth,
        "felt_reports": felt,
        "alert_level": props.get("alert"),
        "significance": props.get("sig"),
        "network": props.get("net"),
        "tsunami": props.get("tsunami"),
    });

    Ok(Some(alert))
}

/// Magnitude thresholds for canonical severity.
pub fn severity_for_magnitude(magnitude: f64) -> Severity {
    if magnitude >= 7.0 {
        Severity::Extreme
    } else if magnitude >= 6.0 {
        Severity::Severe
    } else if magnitude >= 5.0 {
        Severity::Moderate
    } else {
        Severity::Minor
    }
}

/// Affected radius scaled by magnitude, in miles.
pub fn radius_for_magnitude(magnitude: f64) -> f64 {
    if magnitude >= 7.0 {
        200.0
    } else if magnitude >= 6.0 {
        100.0
    } else if magnitude >= 5.0 {
        50.0
    } else if magnitude >= 4.0 {
        25.0
    } else {
        10.0
    }
}

/// How long a quake alert stays active. Instant events, but major
/// ones are kept visible longer.
fn expiry_hours(magnitude: f64) -> i64 {
    if magnitude >= 6.0 {
        24
    } else if magnitude >= 5.0 {
        12
    } else {
        6
    }
}
