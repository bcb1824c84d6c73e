//! Affected-recipient resolution.
//!
//! Three routes into the candidate set: home location within combined
//! radius, a matching custom zone, or a subscribed region. A recipient
//! reached by more than one route appears once.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use vigil_core::Alert;
use vigil_geo::{intersects_polygon, within_radius};
use vigil_storage::{Recipient, RecipientStore, StorageError, Zone, ZoneStore};

use crate::filters::zone_accepts;

/// Whether an alert's footprint matches a zone's geofence.
fn zone_matches(zone: &Zone, alert: &Alert) -> bool {
    let Some(area) = alert.area() else {
        // Region-only alerts reach zones through region subscriptions,
        // not geometry.
        return false;
    };

    if let Some(ref polygon) = zone.polygon {
        return intersects_polygon(&area, polygon);
    }
    if let (Some(center), Some(radius)) = (zone.center, zone.radius_miles) {
        return within_radius(&area, &center, radius);
    }
    warn!(zone = %zone.id, "zone has neither polygon nor circle, skipping");
    false
}

/// Resolve the deduplicated candidate set for an alert.
pub async fn resolve_recipients(
    alert: &Alert,
    recipients: &Arc<dyn RecipientStore>,
    zones: &Arc<dyn ZoneStore>,
) -> Result<Vec<Recipient>, StorageError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut resolved = Vec::new();

    // Route 1: home location within the combined radius.
    if let Some(area) = alert.area() {
        for recipient in recipients.active_with_home().await? {
            let Some(home) = recipient.home else { continue };
            if within_radius(&area, &home, recipient.alert_radius_miles)
                && seen.insert(recipient.id.clone())
            {
                resolved.push(recipient);
            }
        }
    }

    // Route 2: custom zones, honoring each zone's own filter.
    for zone in zones.active_zones().await? {
        if seen.contains(&zone.recipient_id) {
            continue;
        }
        if !zone_accepts(&zone, alert) || !zone_matches(&zone, alert) {
            continue;
        }
        match recipients.get(&zone.recipient_id).await? {
            Some(recipient) if recipient.is_active => {
                seen.insert(recipient.id.clone());
                resolved.push(recipient);
            }
            _ => {}
        }
    }

    // Route 3: region subscriptions.
    if !alert.affected_regions.is_empty() {
        for recipient in recipients.active_in_regions(&alert.affected_regions).await? {
            if seen.insert(recipient.id.clone()) {
                resolved.push(recipient);
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use vigil_core::{Category, Severity};
    use vigil_db_memory::{InMemoryRecipientStore, InMemoryZoneStore};
    use vigil_geo::GeoPoint;

    fn point_alert(lat: f64, lon: f64, radius: f64) -> Alert {
        let mut alert = Alert::new(
            "t_1",
            "T",
            "T",
            Severity::Severe,
            Category::Weather,
            datetime!(2025-06-01 00:00:00 UTC),
            "test",
        );
        alert.latitude = Some(lat);
        alert.longitude = Some(lon);
        alert.radius_miles = Some(radius);
        alert
    }

    async fn stores() -> (
        Arc<dyn RecipientStore>,
        Arc<InMemoryRecipientStore>,
        Arc<dyn ZoneStore>,
        Arc<InMemoryZoneStore>,
    ) {
        let recipients = Arc::new(InMemoryRecipientStore::new());
        let zones = Arc::new(InMemoryZoneStore::new());
        let recipients_dyn: Arc<dyn RecipientStore> = recipients.clone();
        let zones_dyn: Arc<dyn ZoneStore> = zones.clone();
        (recipients_dyn, recipients, zones_dyn, zones)
    }

    #[tokio::test]
    async fn home_radius_route_uses_combined_radius() {
        let (recipients_dyn, recipients, zones_dyn, _zones) = stores().await;

        // ~5 miles from the alert center.
        let mut near = Recipient::new("near");
        near.home = Some(GeoPoint::new(21.38, -157.85));
        near.alert_radius_miles = 0.0;
        recipients.insert(near).await;

        // ~40 miles away.
        let mut far = Recipient::new("far");
        far.home = Some(GeoPoint::new(21.88, -157.55));
        far.alert_radius_miles = 0.0;
        recipients.insert(far).await;

        let alert = point_alert(21.31, -157.86, 10.0);
        let resolved = resolve_recipients(&alert, &recipients_dyn, &zones_dyn)
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "near");
    }

    #[tokio::test]
    async fn zone_route_fetches_owner_once() {
        let (recipients_dyn, recipients, zones_dyn, zones) = stores().await;

        // Recipient with a home inside the alert radius AND a matching
        // zone: must resolve exactly once.
        let mut both = Recipient::new("both");
        both.home = Some(GeoPoint::new(21.31, -157.86));
        recipients.insert(both).await;

        let mut zone_only = Recipient::new("zone-only");
        zone_only.home = None;
        recipients.insert(zone_only).await;

        zones
            .insert(Zone::circle(
                "both",
                "work",
                GeoPoint::new(21.32, -157.85),
                5.0,
            ))
            .await;
        zones
            .insert(Zone::circle(
                "zone-only",
                "home away",
                GeoPoint::new(21.30, -157.87),
                5.0,
            ))
            .await;

        let alert = point_alert(21.31, -157.86, 10.0);
        let resolved = resolve_recipients(&alert, &recipients_dyn, &zones_dyn)
            .await
            .unwrap();

        let mut ids: Vec<_> = resolved.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["both", "zone-only"]);
    }

    #[tokio::test]
    async fn zone_filter_excludes_mismatched_category() {
        let (recipients_dyn, recipients, zones_dyn, zones) = stores().await;

        recipients.insert(Recipient::new("r1")).await;
        let mut zone = Zone::circle("r1", "surf spots", GeoPoint::new(21.31, -157.86), 25.0);
        zone.categories = Some(vec![Category::Marine]);
        zones.insert(zone).await;

        let alert = point_alert(21.31, -157.86, 10.0); // Weather
        let resolved = resolve_recipients(&alert, &recipients_dyn, &zones_dyn)
            .await
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn region_route_dedupes_against_geo_routes() {
        let (recipients_dyn, recipients, zones_dyn, _zones) = stores().await;

        let mut geo_and_region = Recipient::new("geo-and-region");
        geo_and_region.home = Some(GeoPoint::new(21.31, -157.86));
        geo_and_region.subscribed_regions = vec!["Honolulu County".into()];
        recipients.insert(geo_and_region).await;

        let mut region_only = Recipient::new("region-only");
        region_only.subscribed_regions = vec!["Honolulu County".into()];
        recipients.insert(region_only).await;

        let mut alert = point_alert(21.31, -157.86, 10.0);
        alert.affected_regions = vec!["Honolulu County".into()];

        let resolved = resolve_recipients(&alert, &recipients_dyn, &zones_dyn)
            .await
            .unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[tokio::test]
    async fn region_only_alert_skips_geometry_routes() {
        let (recipients_dyn, recipients, zones_dyn, zones) = stores().await;

        let mut homebody = Recipient::new("homebody");
        homebody.home = Some(GeoPoint::new(21.31, -157.86));
        recipients.insert(homebody).await;

        let mut subscriber = Recipient::new("subscriber");
        subscriber.subscribed_regions = vec!["Maui County".into()];
        recipients.insert(subscriber).await;

        zones
            .insert(Zone::circle(
                "homebody",
                "zone",
                GeoPoint::new(21.31, -157.86),
                50.0,
            ))
            .await;

        let mut alert = point_alert(21.31, -157.86, 10.0);
        alert.latitude = None;
        alert.longitude = None;
        alert.radius_miles = None;
        alert.affected_regions = vec!["Maui County".into()];

        let resolved = resolve_recipients(&alert, &recipients_dyn, &zones_dyn)
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "subscriber");
    }
}
