use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both coordinates are finite and inside the valid WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A simple (non-self-intersecting) polygon as an ordered exterior ring
/// of `[longitude, latitude]` vertices, GeoJSON coordinate order.
///
/// The ring may or may not repeat the first vertex at the end; both
/// forms are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPolygon {
    pub exterior: Vec<[f64; 2]>,
}

impl GeoPolygon {
    pub fn new(exterior: Vec<[f64; 2]>) -> Self {
        Self { exterior }
    }

    /// At least three distinct finite vertices.
    pub fn is_valid(&self) -> bool {
        if self.exterior.len() < 3 {
            return false;
        }
        if self
            .exterior
            .iter()
            .any(|v| !v[0].is_finite() || !v[1].is_finite())
        {
            return false;
        }
        let mut distinct = self.exterior.clone();
        distinct.dedup();
        if distinct.len() > 1 && distinct.first() == distinct.last() {
            distinct.pop();
        }
        distinct.len() >= 3
    }

    /// The ring without a repeated closing vertex.
    pub(crate) fn open_ring(&self) -> &[[f64; 2]] {
        let n = self.exterior.len();
        if n > 1 && self.exterior[0] == self.exterior[n - 1] {
            &self.exterior[..n - 1]
        } else {
            &self.exterior
        }
    }
}

/// The geographic footprint of an alert, as used by the matching
/// functions. Alerts with neither a point nor a polygon are
/// region-only and have no area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertArea {
    /// A point with an affected radius in miles (0 for a bare point).
    Point { point: GeoPoint, radius_miles: f64 },
    /// A polygon boundary.
    Polygon(GeoPolygon),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_validity() {
        assert!(GeoPoint::new(21.3, -157.8).is_valid());
        assert!(!GeoPoint::new(f64::NAN, -157.8).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn polygon_validity() {
        let triangle = GeoPolygon::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        assert!(triangle.is_valid());

        let closed = GeoPolygon::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]);
        assert!(closed.is_valid());
        assert_eq!(closed.open_ring().len(), 3);

        let degenerate = GeoPolygon::new(vec![[0.0, 0.0], [1.0, 0.0]]);
        assert!(!degenerate.is_valid());

        let closed_pair = GeoPolygon::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]);
        assert!(!closed_pair.is_valid());

        let nan = GeoPolygon::new(vec![[0.0, f64::NAN], [1.0, 0.0], [0.0, 1.0]]);
        assert!(!nan.is_valid());
    }

    #[test]
    fn polygon_serde_round_trip() {
        let poly = GeoPolygon::new(vec![[-158.3, 21.3], [-157.7, 21.3], [-157.7, 21.7]]);
        let json = serde_json::to_string(&poly).unwrap();
        let back: GeoPolygon = serde_json::from_str(&json).unwrap();
        assert_eq!(poly, back);
    }
}
