//! Volcanic observatory feed.
//!
//! Combines two signals per vent: the observatory's color code parsed
//! from its update page, and a quake-swarm heuristic over the daily
//! seismic feed. The higher of the two levels wins. GREEN produces no
//! alert.

use reqwest::Client;
use serde_json::Value;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use async_trait::async_trait;
use vigil_core::{Alert, Category, Severity};

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::seismic::{self, DEFAULT_BASE_URL as DEFAULT_QUAKE_URL};

pub const DEFAULT_BASE_URL: &str = "https://www.usgs.gov";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Quakes within this box around a vent count toward a swarm (~10 km).
const SWARM_DEGREES: f64 = 0.1;
/// Daily quake counts that raise the level.
const SWARM_ADVISORY_COUNT: usize = 10;
const SWARM_WATCH_COUNT: usize = 20;

struct Vent {
    key: &'static str,
    name: &'static str,
    lat: f64,
    lon: f64,
    usgs_id: &'static str,
    region: &'static str,
}

const VENTS: &[Vent] = &[
    Vent {
        key: "kilauea",
        name: "Kilauea",
        lat: 19.4069,
        lon: -155.2834,
        usgs_id: "1302251",
        region: "Hawaii County",
    },
    Vent {
        key: "mauna_loa",
        name: "Mauna Loa",
        lat: 19.4721,
        lon: -155.5922,
        usgs_id: "1302241",
        region: "Hawaii County",
    },
    Vent {
        key: "hualalai",
        name: "Hualalai",
        lat: 19.6920,
        lon: -155.8700,
        usgs_id: "1302261",
        region: "Hawaii County",
    },
    Vent {
        key: "haleakala",
        name: "Haleakala",
        lat: 20.7097,
        lon: -156.2533,
        usgs_id: "1302281",
        region: "Maui County",
    },
    Vent {
        key: "mauna_kea",
        name: "Mauna Kea",
        lat: 19.8207,
        lon: -155.4680,
        usgs_id: "1302231",
        region: "Hawaii County",
    },
];

/// Observatory color code, ordered by concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Orange => "ORANGE",
            Self::Red => "RED",
        }
    }

    fn parse(code: &str) -> Option<Self> {
        match code {
            "GREEN" => Some(Self::Green),
            "YELLOW" => Some(Self::Yellow),
            "ORANGE" => Some(Self::Orange),
            "RED" => Some(Self::Red),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Green => Severity::Minor,
            Self::Yellow => Severity::Moderate,
            Self::Orange => Severity::Severe,
            Self::Red => Severity::Extreme,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Green => "Normal",
            Self::Yellow => "Advisory",
            Self::Orange => "Watch",
            Self::Red => "Warning",
        }
    }
}

/// Parse a color code out of observatory update text.
pub fn parse_alert_level(content: &str) -> AlertLevel {
    let upper = content.to_uppercase();
    if upper.contains("ALERT LEVEL: RED") || upper.contains("WARNING") {
        AlertLevel::Red
    } else if upper.contains("ALERT LEVEL: ORANGE") || upper.contains("WATCH") {
        AlertLevel::Orange
    } else if upper.contains("ALERT LEVEL: YELLOW") || upper.contains("ADVISORY") {
        AlertLevel::Yellow
    } else {
        AlertLevel::Green
    }
}

/// Swarm size to level: none below the advisory count.
fn swarm_level(count: usize) -> Option<AlertLevel> {
    if count >= SWARM_WATCH_COUNT {
        Some(AlertLevel::Orange)
    } else if count >= SWARM_ADVISORY_COUNT {
        Some(AlertLevel::Yellow)
    } else {
        None
    }
}

pub struct VolcanoAdapter {
    client: Client,
    base_url: String,
    quake_feed_url: String,
}

impl VolcanoAdapter {
    pub fn new(base_url: impl Into<String>, quake_feed_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            quake_feed_url: quake_feed_url.into(),
        }
    }

    async fn fetch_vent_level(&self, vent: &Vent) -> Result<AlertLevel, SourceError> {
        let url = format!(
            "{}/volcanoes/{}/volcano-updates",
            self.base_url.trim_end_matches('/'),
            vent.key
        );
        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }
        Ok(parse_alert_level(&response.text().await?))
    }

    /// Daily quake counts near each vent, in `VENTS` order.
    async fn swarm_counts(&self) -> Vec<usize> {
        let quakes =
            match seismic::fetch_feed(&self.client, &self.quake_feed_url, "2.5", "day").await {
                Ok(features) => features,
                Err(err) => {
                    warn!(source = "volcano", error = %err, "swarm check feed failed");
                    return vec![0; VENTS.len()];
                }
            };

        VENTS
            .iter()
            .map(|vent| {
                quakes
                    .iter()
                    .filter_map(|quake| {
                        let coords = quake.get("geometry")?.get("coordinates")?.as_array()?;
                        let lon = coords.first()?.as_f64()?;
                        let lat = coords.get(1)?.as_f64()?;
                        Some((lat, lon))
                    })
                    .filter(|(lat, lon)| {
                        (lat - vent.lat).abs() < SWARM_DEGREES
                            && (lon - vent.lon).abs() < SWARM_DEGREES
                    })
                    .count()
            })
            .collect()
    }
}

impl Default for VolcanoAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_QUAKE_URL)
    }
}

#[async_trait]
impl SourceAdapter for VolcanoAdapter {
    fn name(&self) -> &'static str {
        "volcano"
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let swarm_counts = self.swarm_counts().await;
        let mut records = Vec::new();

        for (vent, quake_count) in VENTS.iter().zip(swarm_counts) {
            // One vent's page failing must not hide the others.
            let observed = match self.fetch_vent_level(vent).await {
                Ok(level) => level,
                Err(err) => {
                    warn!(source = "volcano", vent = vent.key, error = %err, "status page failed");
                    AlertLevel::Green
                }
            };

            let level = match swarm_level(quake_count) {
                Some(swarm) => observed.max(swarm),
                None => observed,
            };

            if level != AlertLevel::Green {
                records.push(serde_json::json!({
                    "vent": vent.key,
                    "alert_level": level.as_str(),
                    "earthquake_count": quake_count,
                }));
            }
        }

        Ok(records)
    }

    fn convert(&self, raw: &[Value]) -> Vec<Alert> {
        raw.iter()
            .filter_map(|record| match convert_record(record) {
                Ok(alert) => alert,
                Err(reason) => {
                    warn!(source = "volcano", %reason, "skipping malformed record");
                    None
                }
            })
            .collect()
    }
}

fn convert_record(record: &Value) -> Result<Option<Alert>, String> {
    let key = record
        .get("vent")
        .and_then(Value::as_str)
        .ok_or("missing vent")?;
    let vent = VENTS
        .iter()
        .find(|v| v.key == key)
        .ok_or("unknown vent")?;
    let level = record
        .get("alert_level")
        .and_then(Value::as_str)
        .and_then(AlertLevel::parse)
        .ok_or("missing alert level")?;
    if level == AlertLevel::Green {
        return Ok(None);
    }
    let quake_count = record
        .get("earthquake_count")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut description = format!("{} is at {} level. ", vent.name, level.description());
    if quake_count > 0 {
        description.push_str(&format!(
            "{quake_count} earthquakes detected near the volcano in the last 24 hours. "
        ));
    }
    description.push_str(match level {
        AlertLevel::Red => "ERUPTION IMMINENT OR IN PROGRESS. Follow evacuation orders immediately.",
        AlertLevel::Orange => {
            "Increased volcanic activity detected. Be prepared to evacuate if conditions worsen."
        }
        AlertLevel::Yellow => "Elevated volcanic unrest. Stay informed and be prepared.",
        AlertLevel::Green => "",
    });

    let now = OffsetDateTime::now_utc();
    let date_key = now
        .format(format_description!("[year][month][day]"))
        .map_err(|e| e.to_string())?;

    let mut alert = Alert::new(
        format!("volcano_{key}_{date_key}"),
        format!("Volcano Alert: {} - {}", vent.name, level.description()),
        description,
        level.severity(),
        Category::Volcano,
        now,
        "USGS Hawaiian Volcano Observatory",
    );
    alert.location_name = Some(format!("{} Volcano", vent.name));
    alert.latitude = Some(vent.lat);
    alert.longitude = Some(vent.lon);
    alert.radius_miles = Some(if level >= AlertLevel::Orange { 50.0 } else { 25.0 });
    alert.affected_regions = vec![vent.region.to_string()];
    alert.expires_time = Some(now + Duration::hours(24));
    alert.metadata = serde_json::json!({
        "volcano_name": vent.name,
        "alert_level": level.as_str(),
        "earthquake_count": quake_count,
        "usgs_volcano_id": vent.usgs_id,
    });

    Ok(Some(alert))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_parsing_from_page_text() {
        assert_eq!(
            parse_alert_level("Current Alert Level: RED. Eruption in progress."),
            AlertLevel::Red
        );
        assert_eq!(parse_alert_level("volcano WATCH in effect"), AlertLevel::Orange);
        assert_eq!(parse_alert_level("advisory: elevated unrest"), AlertLevel::Yellow);
        assert_eq!(parse_alert_level("All quiet on the summit."), AlertLevel::Green);
    }

    #[test]
    fn swarm_thresholds() {
        assert_eq!(swarm_level(9), None);
        assert_eq!(swarm_level(10), Some(AlertLevel::Yellow));
        assert_eq!(swarm_level(20), Some(AlertLevel::Orange));
    }

    #[test]
    fn level_order_supports_upgrades() {
        assert!(AlertLevel::Orange > AlertLevel::Yellow);
        assert_eq!(AlertLevel::Yellow.max(AlertLevel::Orange), AlertLevel::Orange);
        assert_eq!(AlertLevel::Red.severity(), Severity::Extreme);
    }

    #[test]
    fn convert_builds_one_alert_per_vent_day() {
        let adapter = VolcanoAdapter::default();
        let record = json!({
            "vent": "kilauea",
            "alert_level": "ORANGE",
            "earthquake_count": 15,
        });
        let alerts = adapter.convert(&[record]);
        assert_eq!(alerts.len(), 1);

        let alert = &alerts[0];
        assert!(alert.external_id.starts_with("volcano_kilauea_"));
        assert_eq!(alert.severity, Severity::Severe);
        assert_eq!(alert.category, Category::Volcano);
        assert_eq!(alert.radius_miles, Some(50.0));
        assert_eq!(alert.affected_regions, vec!["Hawaii County"]);
        assert!(alert.description.contains("15 earthquakes"));
    }

    #[test]
    fn convert_drops_green_and_unknown_vents() {
        let adapter = VolcanoAdapter::default();
        let green = json!({"vent": "kilauea", "alert_level": "GREEN"});
        let unknown = json!({"vent": "st_helens", "alert_level": "RED"});
        assert!(adapter.convert(&[green, unknown]).is_empty());
    }

    mod fetch {
        use super::*;
        use crate::adapter::SourceAdapter;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn fetch_merges_status_and_swarm_signals() {
            let server = MockServer::start().await;

            // Kilauea reports WATCH; everything else is quiet.
            Mock::given(method("GET"))
                .and(path("/volcanoes/kilauea/volcano-updates"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string("ALERT LEVEL: ORANGE (WATCH)"),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/2.5_day.geojson"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
                .mount(&server)
                .await;
            // Remaining vent pages 404; treated as quiet, not fatal.
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let adapter = VolcanoAdapter::new(server.uri(), server.uri());
            let records = adapter.fetch().await.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0]["vent"], "kilauea");
            assert_eq!(records[0]["alert_level"], "ORANGE");
        }

        #[tokio::test]
        async fn swarm_alone_raises_a_quiet_vent() {
            let server = MockServer::start().await;

            let near_kilauea: Vec<Value> = (0..12)
                .map(|_| json!({"geometry": {"coordinates": [-155.28, 19.41, 2.0]}}))
                .collect();
            Mock::given(method("GET"))
                .and(path("/2.5_day.geojson"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"features": near_kilauea})),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("all quiet"))
                .mount(&server)
                .await;

            let adapter = VolcanoAdapter::new(server.uri(), server.uri());
            let records = adapter.fetch().await.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0]["vent"], "kilauea");
            assert_eq!(records[0]["alert_level"], "YELLOW");
            assert_eq!(records[0]["earthquake_count"], 12);
        }
    }
}
