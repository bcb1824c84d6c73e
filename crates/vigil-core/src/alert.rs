use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use vigil_geo::{AlertArea, GeoPoint, GeoPolygon};

/// Ordered alert severity. Variant order is the threshold order used
/// by every severity comparison in the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    /// Numeric rank, minor=1 .. extreme=4.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Severe => 3,
            Self::Extreme => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Extreme => "extreme",
        }
    }
}

/// Canonical hazard category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Weather,
    Earthquake,
    Tsunami,
    Volcano,
    Wildfire,
    Flood,
    Hurricane,
    Marine,
    Security,
    Civil,
    Health,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Earthquake => "earthquake",
            Self::Tsunami => "tsunami",
            Self::Volcano => "volcano",
            Self::Wildfire => "wildfire",
            Self::Flood => "flood",
            Self::Hurricane => "hurricane",
            Self::Marine => "marine",
            Self::Security => "security",
            Self::Civil => "civil",
            Self::Health => "health",
            Self::Other => "other",
        }
    }
}

/// Canonical hazard event.
///
/// An alert carries either a point with a radius, a polygon, or
/// neither (region-only targeting). The `external_id` is the
/// idempotency key: one row per upstream record, updated in place on
/// re-sync and flipped inactive by the expiry sweep, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,

    /// Canonical external id, `<source>_<rawId>`.
    pub external_id: String,

    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: Category,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_miles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<GeoPolygon>,

    #[serde(default)]
    pub affected_regions: Vec<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub effective_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub expires_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Free-form source metadata, carried through untouched.
    #[serde(default)]
    pub metadata: serde_json::Value,

    pub is_active: bool,
    #[serde(default)]
    pub is_test: bool,
}

impl Alert {
    /// A new active alert with a fresh internal id.
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        category: Category,
        effective_time: OffsetDateTime,
        source: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            external_id: external_id.into(),
            title: title.into(),
            description: description.into(),
            severity,
            category,
            location_name: None,
            latitude: None,
            longitude: None,
            radius_miles: None,
            polygon: None,
            affected_regions: Vec::new(),
            effective_time,
            expires_time: None,
            created_at: now,
            updated_at: now,
            source: source.into(),
            source_url: None,
            metadata: serde_json::Value::Null,
            is_active: true,
            is_test: false,
        }
    }

    /// The geographic footprint, if the alert has one. A missing
    /// radius on a point alert counts as zero.
    pub fn area(&self) -> Option<AlertArea> {
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            return Some(AlertArea::Point {
                point: GeoPoint::new(lat, lon),
                radius_miles: self.radius_miles.unwrap_or(0.0),
            });
        }
        self.polygon.clone().map(AlertArea::Polygon)
    }

    /// Whether the alert's expiry time has passed.
    ///
    /// Alerts without an expiry never expire.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_time, Some(t) if t < now)
    }

    /// Overwrite the mutable fields from a freshly converted upstream
    /// record, keeping identity and creation time. Used by upsert.
    pub fn apply_update(&mut self, incoming: &Alert, now: OffsetDateTime) {
        self.title = incoming.title.clone();
        self.description = incoming.description.clone();
        self.severity = incoming.severity;
        self.category = incoming.category;
        self.location_name = incoming.location_name.clone();
        self.latitude = incoming.latitude;
        self.longitude = incoming.longitude;
        self.radius_miles = incoming.radius_miles;
        self.polygon = incoming.polygon.clone();
        self.affected_regions = incoming.affected_regions.clone();
        self.effective_time = incoming.effective_time;
        self.expires_time = incoming.expires_time;
        self.source = incoming.source.clone();
        self.source_url = incoming.source_url.clone();
        self.metadata = incoming.metadata.clone();
        self.is_active = incoming.is_active;
        self.is_test = incoming.is_test;
        self.updated_at = now;
    }
}
