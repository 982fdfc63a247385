use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Search radius used when neither the caller nor the configuration picks one
pub const DEFAULT_RADIUS_KM: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub latitude: f64,
  pub longitude: f64,
}

impl GeoPoint {
  pub fn new(latitude: f64, longitude: f64) -> Self {
    Self { latitude, longitude }
  }
}

/// A catalog row that lies within the search radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearby {
  pub row: usize,
  pub distance_km: f64,
}

/// Great-circle distance between two points in kilometres (haversine formula)
pub fn haversine_distance(from: GeoPoint, to: GeoPoint) -> f64 {
  let d_lat = (to.latitude - from.latitude).to_radians();
  let d_lon = (to.longitude - from.longitude).to_radians();

  let a = (d_lat / 2.0).sin().powi(2)
    + from.latitude.to_radians().cos()
      * to.latitude.to_radians().cos()
      * (d_lon / 2.0).sin().powi(2);
  // rounding can push `a` a hair past 1 for antipodal points
  let a = a.clamp(0.0, 1.0);

  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
  EARTH_RADIUS_KM * c
}

/// Keep the catalog rows within `radius_km` of `origin`, in catalog order.
///
/// Rows without usable coordinates are skipped.
pub fn filter_by_location(origin: GeoPoint, catalog: &Catalog, radius_km: f64) -> Vec<Nearby> {
  catalog
    .iter()
    .enumerate()
    .filter_map(|(row, entry)| {
      let point = entry.coordinates()?;
      let distance_km = haversine_distance(origin, point);
      (distance_km <= radius_km).then_some(Nearby { row, distance_km })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::CatalogEntry;

  fn at(name: &str, latitude: Option<f64>, longitude: Option<f64>) -> CatalogEntry {
    CatalogEntry { latitude, longitude, ..CatalogEntry::new(name) }
  }

  #[test]
  fn test_distance_to_self_is_zero() {
    let p = GeoPoint::new(12.9716, 77.5946);
    assert_eq!(haversine_distance(p, p), 0.0);
  }

  #[test]
  fn test_distance_is_symmetric() {
    let points = [
      GeoPoint::new(12.9716, 77.5946),
      GeoPoint::new(28.6139, 77.2090),
      GeoPoint::new(-33.8688, 151.2093),
      GeoPoint::new(51.5074, -0.1278),
      GeoPoint::new(0.0, 180.0),
      GeoPoint::new(0.0, -180.0),
    ];

    for a in points {
      for b in points {
        let ab = haversine_distance(a, b);
        let ba = haversine_distance(b, a);
        assert!((ab - ba).abs() < 1e-9, "{a:?} -> {b:?}: {ab} vs {ba}");
      }
    }
  }

  #[test]
  fn test_known_distance() {
    // Bengaluru to Delhi is roughly 1740 km as the crow flies
    let blr = GeoPoint::new(12.9716, 77.5946);
    let del = GeoPoint::new(28.6139, 77.2090);
    let d = haversine_distance(blr, del);
    assert!((1730.0..1750.0).contains(&d), "got {d}");
  }

  #[test]
  fn test_antipodal_points_do_not_produce_nan() {
    let d = haversine_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
    assert!(d.is_finite());
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-3);
  }

  #[test]
  fn test_filter_keeps_rows_within_radius_in_order() {
    let origin = GeoPoint::new(12.9716, 77.5946);
    let catalog = Catalog::new(vec![
      at("far", Some(13.2), Some(77.7)),
      at("near-b", Some(12.975), Some(77.60)),
      at("missing", None, Some(77.59)),
      at("near-a", Some(12.9719), Some(77.5937)),
    ]);

    let nearby = filter_by_location(origin, &catalog, DEFAULT_RADIUS_KM);
    let rows: Vec<usize> = nearby.iter().map(|n| n.row).collect();

    assert_eq!(rows, vec![1, 3]);
    for n in &nearby {
      assert!(n.distance_km <= DEFAULT_RADIUS_KM);
    }
  }

  #[test]
  fn test_filter_never_returns_rows_without_coordinates() {
    let origin = GeoPoint::new(0.0, 0.0);
    let catalog = Catalog::new(vec![
      at("lat only", Some(0.0), None),
      at("lon only", None, Some(0.0)),
      at("neither", None, None),
    ]);

    assert!(filter_by_location(origin, &catalog, 50_000.0).is_empty());
  }

  #[test]
  fn test_filter_with_nothing_nearby_is_empty() {
    let catalog = Catalog::new(vec![at("blr", Some(12.9716), Some(77.5946))]);
    let delhi = GeoPoint::new(28.6139, 77.2090);
    assert!(filter_by_location(delhi, &catalog, DEFAULT_RADIUS_KM).is_empty());
  }
}
