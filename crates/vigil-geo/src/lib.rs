//! Geographic matching primitives for alert/recipient resolution.
//!
//! Everything here is deterministic and side-effect free. Malformed
//! geometry never surfaces as an error to callers: it degrades to a
//! non-match with a logged warning, so a bad polygon from an upstream
//! feed cannot take down a dispatch pass.

pub mod matching;
pub mod types;

pub use matching::{
    EARTH_RADIUS_MILES, MILES_PER_DEGREE, POLYGON_RADIUS_BUFFER_MILES, centroid, distance_miles,
    intersects_polygon, point_in_polygon, within_radius,
};
pub use types::{AlertArea, GeoPoint, GeoPolygon};
