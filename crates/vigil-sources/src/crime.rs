//! Municipal crime incident feed.

use reqwest::Client;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use async_trait::async_trait;
use vigil_core::{Alert, Category, Severity};

use crate::adapter::SourceAdapter;
use crate::error::SourceError;

pub const DEFAULT_BASE_URL: &str = "https://data.honolulu.gov/resource/pka4-quqb.json";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const FETCH_LIMIT: u32 = 100;

/// Incidents are hyper-local; half a mile covers the block.
const INCIDENT_RADIUS_MILES: f64 = 0.5;
/// Incidents age out after a day.
const INCIDENT_TTL_HOURS: i64 = 24;

/// Incident-type substring to severity. First match wins; anything
/// unmatched defaults to moderate.
const CRIME_SEVERITY: &[(&str, Severity)] = &[
    ("homicide", Severity::Extreme),
    ("shooting", Severity::Extreme),
    ("armed_robbery", Severity::Severe),
    ("assault", Severity::Severe),
    ("robbery", Severity::Severe),
    ("burglary", Severity::Moderate),
    ("theft", Severity::Minor),
    ("vandalism", Severity::Minor),
];

pub fn severity_for_incident_type(incident_type: &str) -> Severity {
    let lowered = incident_type.to_lowercase();
    CRIME_SEVERITY
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, severity)| *severity)
        .unwrap_or(Severity::Moderate)
}

pub struct CrimeAdapter {
    client: Client,
    base_url: String,
}

impl CrimeAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for CrimeAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl SourceAdapter for CrimeAdapter {
    fn name(&self) -> &'static str {
        "crime"
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("$limit", FETCH_LIMIT.to_string()),
                ("$order", "date DESC".to_string()),
            ])
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
        match body.as_array() {
            Some(incidents) => Ok(incidents.clone()),
            None => Err(SourceError::malformed("expected incident array")),
        }
    }

    fn convert(&self, raw: &[Value]) -> Vec<Alert> {
        raw.iter()
            .filter_map(|incident| match convert_incident(incident) {
                Ok(alert) => Some(alert),
                Err(reason) => {
                    warn!(source = "crime", %reason, "skipping malformed record");
                    None
                }
            })
            .collect()
    }
}

fn convert_incident(incident: &Value) -> Result<Alert, String> {
    let raw_id = incident
        .get("incident_number")
        .or_else(|| incident.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or("missing incident number")?;

    let incident_type = incident
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let location = incident
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or("Unknown location");

    let latitude = parse_coordinate(incident.get("latitude")).ok_or("missing latitude")?;
    let longitude = parse_coordinate(incident.get("longitude")).ok_or("missing longitude")?;

    let now = OffsetDateTime::now_utc();
    let effective_time = incident
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or(now);

    let mut alert = Alert::new(
        format!("crime_{raw_id}"),
        format!("Crime Alert - {}", title_case(incident_type)),
        format!(
            "{} at {location}",
            incident
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("Crime incident reported")
        ),
        severity_for_incident_type(incident_type),
        Category::Security,
        effective_time,
        format!(
            "Crime Data - {}",
            incident.get("source").and_then(Value::as_str).unwrap_or("HPD")
        ),
    );
    alert.location_name = Some(location.to_string());
    alert.latitude = Some(latitude);
    alert.longitude = Some(longitude);
    alert.radius_miles = Some(INCIDENT_RADIUS_MILES);
    alert.affected_regions = incident
        .get("county")
        .and_then(Value::as_str)
        .map(|county| vec![county.to_string()])
        .unwrap_or_default();
    alert.expires_time = Some(now + Duration::hours(INCIDENT_TTL_HOURS));
    alert.metadata = incident.clone();

    Ok(alert)
}

/// Feeds report coordinates as numbers or strings; accept both.
fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn title_case(input: &str) -> String {
    input
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
