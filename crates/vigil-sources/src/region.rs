//! Coordinate-to-region heuristics.
//!
//! Coarse bounding boxes for the Hawaii county jurisdictions, used
//! when a feed reports only coordinates. A point matching no box falls
//! back to Hawaii County, mirroring the upstream feeds' own fallback.

/// Administrative regions covering a coordinate.
pub fn regions_for_point(lat: f64, lon: f64) -> Vec<String> {
    let mut regions = Vec::new();

    if (18.9..=20.3).contains(&lat) && (-156.1..=-154.8).contains(&lon) {
        regions.push("Hawaii County".to_string());
    }
    if (20.5..=21.5).contains(&lat) && (-158.5..=-157.5).contains(&lon) {
        regions.push("Honolulu County".to_string());
    }
    if (20.5..=21.3).contains(&lat) && (-157.0..=-156.0).contains(&lon) {
        regions.push("Maui County".to_string());
        if (20.7..=21.0).contains(&lat) {
            regions.push("Kalawao County".to_string());
        }
    }
    if (21.8..=22.3).contains(&lat) && (-160.0..=-159.0).contains(&lon) {
        regions.push("Kauai County".to_string());
    }

    if regions.is_empty() {
        regions.push("Hawaii County".to_string());
    }
    regions
}

/// Human-readable island label for a coordinate.
pub fn island_label(lat: f64, lon: f64) -> &'static str {
    if (20.5..=21.5).contains(&lat) && (-158.5..=-157.5).contains(&lon) {
        "Oahu"
    } else if (20.5..=21.3).contains(&lat) && (-157.0..=-156.0).contains(&lon) {
        "Maui"
    } else if (21.8..=22.3).contains(&lat) && (-160.0..=-159.0).contains(&lon) {
        "Kauai"
    } else if (18.9..=20.3).contains(&lat) && (-156.1..=-154.8).contains(&lon) {
        "Big Island"
    } else {
        "Hawaii"
    }
}
