//! Distance and containment tests.
//!
//! The polygon-vs-circle paths use fixed buffer approximations instead
//! of exact geodesy; the constants are part of the engine's observable
//! behavior and must not be tuned casually.

use tracing::warn;

use crate::types::{AlertArea, GeoPoint, GeoPolygon};

/// Mean earth radius in miles, as used by the haversine formula.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Buffer added when comparing a query circle against a polygon's
/// centroid, standing in for the polygon's own extent.
pub const POLYGON_RADIUS_BUFFER_MILES: f64 = 20.0;

/// Rough miles-per-degree conversion used to buffer a point alert's
/// radius when testing it against a polygon in degree space.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Great-circle (haversine) distance between two coordinates, in miles.
pub fn distance_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    c * EARTH_RADIUS_MILES
}

/// Ray-casting containment test on a simple polygon.
///
/// Malformed geometry matches nothing.
pub fn point_in_polygon(point: &GeoPoint, polygon: &GeoPolygon) -> bool {
    if !point.is_valid() || !polygon.is_valid() {
        warn!("degenerate geometry in point-in-polygon test, treating as non-match");
        return false;
    }

    let ring = polygon.open_ring();
    let (px, py) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        if ((yi > py) != (yj > py)) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Arithmetic mean of the exterior vertices. Not an exact centroid,
/// but consistent with how upstream feeds summarize their polygons.
pub fn centroid(polygon: &GeoPolygon) -> Option<GeoPoint> {
    if !polygon.is_valid() {
        warn!("degenerate polygon has no centroid");
        return None;
    }
    let ring = polygon.open_ring();
    let n = ring.len() as f64;
    let lon = ring.iter().map(|v| v[0]).sum::<f64>() / n;
    let lat = ring.iter().map(|v| v[1]).sum::<f64>() / n;
    Some(GeoPoint::new(lat, lon))
}

/// Whether an alert's footprint falls within `radius_miles` of a
/// center point.
///
/// Point alerts overlap when the center distance is within the query
/// radius plus the alert's own radius. Polygon alerts are compared by
/// centroid distance with [`POLYGON_RADIUS_BUFFER_MILES`] standing in
/// for the polygon's extent.
pub fn within_radius(area: &AlertArea, center: &GeoPoint, radius_miles: f64) -> bool {
    if !center.is_valid() {
        warn!("invalid center coordinate in radius test, treating as non-match");
        return false;
    }

    match area {
        AlertArea::Point {
            point,
            radius_miles: own_radius,
        } => {
            if !point.is_valid() {
                warn!("invalid alert coordinate in radius test, treating as non-match");
                return false;
            }
            let distance = distance_miles(
                center.latitude,
                center.longitude,
                point.latitude,
                point.longitude,
            );
            distance <= radius_miles + own_radius.max(0.0)
        }
        AlertArea::Polygon(polygon) => match centroid(polygon) {
            Some(c) => {
                let distance =
                    distance_miles(center.latitude, center.longitude, c.latitude, c.longitude);
                distance <= radius_miles + POLYGON_RADIUS_BUFFER_MILES
            }
            None => false,
        },
    }
}

/// Whether an alert's footprint intersects a zone polygon.
///
/// Polygon alerts use a polygon-polygon intersection test. Point
/// alerts with a radius are buffered by `radius / 69` degrees and
/// matched when the point is inside the zone or within that buffer of
/// the zone boundary; bare points use plain containment.
pub fn intersects_polygon(area: &AlertArea, zone: &GeoPolygon) -> bool {
    if !zone.is_valid() {
        warn!("degenerate zone polygon in intersection test, treating as non-match");
        return false;
    }

    match area {
        AlertArea::Polygon(polygon) => {
            if !polygon.is_valid() {
                warn!("degenerate alert polygon in intersection test, treating as non-match");
                return false;
            }
            polygons_intersect(polygon, zone)
        }
        AlertArea::Point {
            point,
            radius_miles,
        } => {
            if !point.is_valid() {
                warn!("invalid alert coordinate in intersection test, treating as non-match");
                return false;
            }
            if *radius_miles > 0.0 {
                let buffer_deg = radius_miles / MILES_PER_DEGREE;
                point_in_polygon(point, zone) || boundary_distance_deg(point, zone) <= buffer_deg
            } else {
                point_in_polygon(point, zone)
            }
        }
    }
}

/// True when the polygons share any area: a vertex of one inside the
/// other, or any pair of edges crossing.
fn polygons_intersect(a: &GeoPolygon, b: &GeoPolygon) -> bool {
    let ring_a = a.open_ring();
    let ring_b = b.open_ring();

    if ring_a
        .iter()
        .any(|v| point_in_polygon(&GeoPoint::new(v[1], v[0]), b))
    {
        return true;
    }
    if ring_b
        .iter()
        .any(|v| point_in_polygon(&GeoPoint::new(v[1], v[0]), a))
    {
        return true;
    }

    for i in 0..ring_a.len() {
        let a1 = ring_a[i];
        let a2 = ring_a[(i + 1) % ring_a.len()];
        for j in 0..ring_b.len() {
            let b1 = ring_b[j];
            let b2 = ring_b[(j + 1) % ring_b.len()];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

fn orientation(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> f64 {
    (q[0] - p[0]) * (r[1] - p[1]) - (q[1] - p[1]) * (r[0] - p[0])
}

fn on_segment(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> bool {
    r[0] >= p[0].min(q[0]) && r[0] <= p[0].max(q[0]) && r[1] >= p[1].min(q[1]) && r[1] <= p[1].max(q[1])
}

fn segments_intersect(a1: [f64; 2], a2: [f64; 2], b1: [f64; 2], b2: [f64; 2]) -> bool {
    let d1 = orientation(a1, a2, b1);
    let d2 = orientation(a1, a2, b2);
    let d3 = orientation(b1, b2, a1);
    let d4 = orientation(b1, b2, a2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear touching cases
    (d1 == 0.0 && on_segment(a1, a2, b1))
        || (d2 == 0.0 && on_segment(a1, a2, b2))
        || (d3 == 0.0 && on_segment(b1, b2, a1))
        || (d4 == 0.0 && on_segment(b1, b2, a2))
}

/// Minimum distance, in degrees, from a point to the polygon boundary.
fn boundary_distance_deg(point: &GeoPoint, polygon: &GeoPolygon) -> f64 {
    let ring = polygon.open_ring();
    let p = [point.longitude, point.latitude];
    let mut min = f64::INFINITY;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        min = min.min(point_segment_distance(p, a, b));
    }
    min
}

fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return ((p[0] - a[0]).powi(2) + (p[1] - a[1]).powi(2)).sqrt();
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (a[0] + t * dx, a[1] + t * dy);
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}
