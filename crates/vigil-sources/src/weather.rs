//! Weather warnings feed (NWS-style CAP alerts).

use reqwest::Client;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use async_trait::async_trait;
use vigil_core::{Alert, Category, Severity};
use vigil_geo::GeoPolygon;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;

pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";
const USER_AGENT: &str = "vigil-alert-hub";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default affected radius for weather alerts without a better
/// estimate, in miles.
const DEFAULT_RADIUS_MILES: f64 = 50.0;

/// Fallback centroid when a record has no geometry (center of the
/// covered area).
const FALLBACK_CENTROID: (f64, f64) = (20.7984, -156.3319);

/// SAME geocode to county lookup.
const SAME_CODES: &[(&str, &str)] = &[
    ("HIC001", "Hawaii County"),
    ("HIC003", "Honolulu County"),
    ("HIC005", "Kalawao County"),
    ("HIC007", "Kauai County"),
    ("HIC009", "Maui County"),
];

pub struct WeatherAdapter {
    client: Client,
    base_url: String,
    area: String,
}

impl WeatherAdapter {
    pub fn new(base_url: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            area: area.into(),
        }
    }
}

impl Default for WeatherAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "HI")
    }
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    fn name(&self) -> &'static str {
        "nws"
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let url = format!(
            "{}/alerts/active?area={}",
            self.base_url.trim_end_matches('/'),
            self.area
        );
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
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

    fn convert(&self, raw: &[Value]) -> Vec<Alert> {
        raw.iter()
            .filter_map(|feature| match convert_feature(feature) {
                Ok(alert) => alert,
                Err(reason) => {
                    warn!(source = "nws", %reason, "skipping malformed record");
                    None
                }
            })
            .collect()
    }
}

/// Ok(None) means the record is valid but not alert-worthy (e.g. a
/// test message); Err skips it as malformed.
fn convert_feature(feature: &Value) -> Result<Option<Alert>, String> {
    let props = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or("missing properties")?;

    // Exercises and drills are not actionable.
    if props.get("status").and_then(Value::as_str) != Some("Actual") {
        return Ok(None);
    }

    let raw_id = props
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or("missing id")?;

    let severity = map_severity(
        props.get("severity").and_then(Value::as_str).unwrap_or("Unknown"),
        props.get("certainty").and_then(Value::as_str).unwrap_or("Unknown"),
    );
    let category = map_category(props.get("event").and_then(Value::as_str).unwrap_or(""));

    let geometry = feature.get("geometry");
    let (lat, lon) = extract_centroid(geometry);
    let polygon = extract_polygon(geometry);

    let now = OffsetDateTime::now_utc();
    let mut alert = Alert::new(
        format!("nws_{raw_id}"),
        props
            .get("headline")
            .and_then(Value::as_str)
            .unwrap_or("Weather Alert"),
        props.get("description").and_then(Value::as_str).unwrap_or(""),
        severity,
        category,
        parse_time(props.get("effective"), now),
        "National Weather Service",
    );
    alert.location_name = props
        .get("areaDesc")
        .and_then(Value::as_str)
        .map(str::to_string);
    alert.latitude = Some(lat);
    alert.longitude = Some(lon);
    alert.radius_miles = Some(DEFAULT_RADIUS_MILES);
    alert.polygon = polygon;
    alert.affected_regions = extract_regions(props);
    alert.expires_time = props
        .get("expires")
        .map(|v| parse_time(Some(v), now));
    alert.source_url = props.get("@id").and_then(Value::as_str).map(str::to_string);
    alert.metadata = serde_json::json!({
        "event": props.get("event"),
        "urgency": props.get("urgency"),
        "certainty": props.get("certainty"),
        "response": props.get("response"),
        "instruction": props.get("instruction"),
    });

    Ok(Some(alert))
}

/// CAP severity/certainty to canonical severity. Uncertain events are
/// downgraded one step unless already extreme; unknown values map to
/// minor.
fn map_severity(severity: &str, certainty: &str) -> Severity {
    let base = match severity {
        "Extreme" => Severity::Extreme,
        "Severe" => Severity::Severe,
        "Moderate" => Severity::Moderate,
        _ => Severity::Minor,
    };

    if matches!(certainty, "Unlikely" | "Possible") && severity != "Extreme" {
        return match base {
            Severity::Severe => Severity::Moderate,
            Severity::Moderate => Severity::Minor,
            other => other,
        };
    }
    base
}

/// Event-type to category lookup; anything unmapped is `Other`.
fn map_category(event: &str) -> Category {
    match event {
        "Hurricane Warning" | "Hurricane Watch" | "Tropical Storm Warning"
        | "Tropical Storm Watch" => Category::Hurricane,
        "High Wind Warning" | "Wind Advisory" | "Severe Thunderstorm Warning"
        | "Severe Thunderstorm Watch" | "Heat Advisory" | "Excessive Heat Warning"
        | "Dense Fog Advisory" => Category::Weather,
        "Flash Flood Warning" | "Flash Flood Watch" | "Flood Warning" | "Flood Advisory"
        | "Coastal Flood Warning" => Category::Flood,
        "Red Flag Warning" | "Fire Weather Watch" => Category::Wildfire,
        "Tsunami Warning" | "Tsunami Advisory" | "Tsunami Watch" => Category::Tsunami,
        "High Surf Warning" | "High Surf Advisory" | "Small Craft Advisory"
        | "Marine Weather Statement" => Category::Marine,
        _ => Category::Other,
    }
}

/// Mean of the polygon vertices, or the area fallback for records
/// without geometry.
fn extract_centroid(geometry: Option<&Value>) -> (f64, f64) {
    let Some(ring) = polygon_ring(geometry) else {
        return FALLBACK_CENTROID;
    };
    let coords: Vec<(f64, f64)> = ring
        .iter()
        .filter_map(|pair| {
            let lon = pair.get(0)?.as_f64()?;
            let lat = pair.get(1)?.as_f64()?;
            Some((lat, lon))
        })
        .collect();
    if coords.is_empty() {
        return FALLBACK_CENTROID;
    }
    let n = coords.len() as f64;
    (
        coords.iter().map(|c| c.0).sum::<f64>() / n,
        coords.iter().map(|c| c.1).sum::<f64>() / n,
    )
}

fn extract_polygon(geometry: Option<&Value>) -> Option<GeoPolygon> {
    let ring = polygon_ring(geometry)?;
    let exterior: Vec<[f64; 2]> = ring
        .iter()
        .filter_map(|pair| {
            let lon = pair.get(0)?.as_f64()?;
            let lat = pair.get(1)?.as_f64()?;
            Some([lon, lat])
        })
        .collect();
    let polygon = GeoPolygon::new(exterior);
    polygon.is_valid().then_some(polygon)
}

fn polygon_ring(geometry: Option<&Value>) -> Option<&Vec<Value>> {
    let geometry = geometry?;
    if geometry.get("type").and_then(Value::as_str) != Some("Polygon") {
        return None;
    }
    geometry
        .get("coordinates")
        .and_then(Value::as_array)?
        .first()
        .and_then(Value::as_array)
}

fn extract_regions(props: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut regions = Vec::new();

    if let Some(area_desc) = props.get("areaDesc").and_then(Value::as_str) {
        let upper = area_desc.to_uppercase();
        let counties = [
            ("HONOLULU", "Honolulu County"),
            ("MAUI", "Maui County"),
            ("KAUAI", "Kauai County"),
            ("KALAWAO", "Kalawao County"),
            ("HAWAII", "Hawaii County"),
        ];
        for (needle, county) in counties {
            if upper.contains(needle) {
                regions.push(county.to_string());
            }
        }
    }

    if let Some(codes) = props
        .get("geocode")
        .and_then(|g| g.get("SAME"))
        .and_then(Value::as_array)
    {
        for code in codes.iter().filter_map(Value::as_str) {
            if let Some((_, county)) = SAME_CODES.iter().find(|(same, _)| *same == code) {
                regions.push((*county).to_string());
            }
        }
    }

    regions.sort();
    regions.dedup();
    if regions.is_empty() {
        regions.push("Hawaii County".to_string());
    }
    regions
}

fn parse_time(value: Option<&Value>, fallback: OffsetDateTime) -> OffsetDateTime {
    value
        .and_then(Value::as_str)
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_feature() -> Value {
        json!({
            "properties": {
                "id": "urn:oid:2.49.0.1.840.0.abc",
                "status": "Actual",
                "event": "Flash Flood Warning",
                "headline": "Flash Flood Warning for Oahu",
                "description": "Heavy rain over the Koolau range",
                "severity": "Severe",
                "certainty": "Observed",
                "areaDesc": "Honolulu; Maui",
                "effective": "2025-06-01T10:00:00-10:00",
                "expires": "2025-06-01T16:00:00-10:00",
                "geocode": {"SAME": ["HIC003"]},
                "@id": "https://api.weather.gov/alerts/abc"
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [-158.3, 21.3], [-157.7, 21.3], [-157.7, 21.7], [-158.3, 21.7], [-158.3, 21.3]
                ]]
            }
        })
    }

    #[test]
    fn severity_mapping_with_certainty_downgrade() {
        assert_eq!(map_severity("Extreme", "Observed"), Severity::Extreme);
        assert_eq!(map_severity("Severe", "Likely"), Severity::Severe);
        assert_eq!(map_severity("Severe", "Possible"), Severity::Moderate);
        assert_eq!(map_severity("Moderate", "Unlikely"), Severity::Minor);
        assert_eq!(map_severity("Minor", "Possible"), Severity::Minor);
        assert_eq!(map_severity("Unknown", "Observed"), Severity::Minor);
        assert_eq!(map_severity("Garbage", "Garbage"), Severity::Minor);
    }

    #[test]
    fn category_mapping_with_conservative_default() {
        assert_eq!(map_category("Hurricane Warning"), Category::Hurricane);
        assert_eq!(map_category("Flash Flood Warning"), Category::Flood);
        assert_eq!(map_category("Red Flag Warning"), Category::Wildfire);
        assert_eq!(map_category("Tsunami Watch"), Category::Tsunami);
        assert_eq!(map_category("High Surf Advisory"), Category::Marine);
        assert_eq!(map_category("Heat Advisory"), Category::Weather);
        assert_eq!(map_category("Never Heard Of It"), Category::Other);
    }

    #[test]
    fn convert_builds_canonical_alert() {
        let adapter = WeatherAdapter::default();
        let alerts = adapter.convert(&[sample_feature()]);
        assert_eq!(alerts.len(), 1);

        let alert = &alerts[0];
        assert_eq!(alert.external_id, "nws_urn:oid:2.49.0.1.840.0.abc");
        assert_eq!(alert.severity, Severity::Severe);
        assert_eq!(alert.category, Category::Flood);
        assert_eq!(alert.radius_miles, Some(50.0));
        assert!(alert.polygon.is_some());
        // Centroid of the square ring (closing vertex included in the mean)
        assert!((alert.latitude.unwrap() - 21.46).abs() < 0.1);
        assert!(alert.affected_regions.contains(&"Honolulu County".to_string()));
        assert!(alert.affected_regions.contains(&"Maui County".to_string()));
        assert!(alert.expires_time.is_some());
    }

    #[test]
    fn convert_skips_non_actual_and_malformed() {
        let adapter = WeatherAdapter::default();

        let mut exercise = sample_feature();
        exercise["properties"]["status"] = json!("Exercise");

        let malformed = json!({"geometry": null});

        let alerts = adapter.convert(&[exercise, malformed, sample_feature()]);
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn regions_default_when_nothing_matches() {
        let props = json!({"areaDesc": "Somewhere Else"});
        let regions = extract_regions(props.as_object().unwrap());
        assert_eq!(regions, vec!["Hawaii County"]);
    }

    mod fetch {
        use super::*;
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn fetch_returns_features() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/alerts/active"))
                .and(query_param("area", "HI"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "features": [sample_feature()]
                })))
                .mount(&server)
                .await;

            let adapter = WeatherAdapter::new(server.uri(), "HI");
            let raw = adapter.fetch().await.unwrap();
            assert_eq!(raw.len(), 1);
        }

        #[tokio::test]
        async fn fetch_propagates_upstream_failure() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/alerts/active"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let adapter = WeatherAdapter::new(server.uri(), "HI");
            let err = adapter.fetch().await.unwrap_err();
            assert!(matches!(err, SourceError::Status { status: 503, .. }));
        }

        #[tokio::test]
        async fn sync_upserts_idempotently() {
            use crate::adapter::{SourceAdapter, SyncContext};
            use std::sync::Arc;
            use vigil_core::AlertBroadcaster;
            use vigil_db_memory::InMemoryAlertStore;

            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/alerts/active"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "features": [sample_feature()]
                })))
                .mount(&server)
                .await;

            let store = Arc::new(InMemoryAlertStore::new());
            let ctx = SyncContext::new(store.clone(), AlertBroadcaster::new());
            let adapter = WeatherAdapter::new(server.uri(), "HI");

            let first = adapter.sync(&ctx).await.unwrap();
            assert_eq!(first.created, 1);
            assert_eq!(first.updated, 0);

            let second = adapter.sync(&ctx).await.unwrap();
            assert_eq!(second.created, 0);
            assert_eq!(second.updated, 1);
            assert_eq!(store.len(), 1);
        }
    }
}
