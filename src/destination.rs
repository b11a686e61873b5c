use std::fmt;

use serde::{Deserialize, Serialize};

// One degree of latitude, and of longitude at the equator
const KM_PER_DEGREE: f64 = 111.0;

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

// geo works in x = longitude, y = latitude
impl From<GeoPoint> for geo::Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::coord! { x: point.lon, y: point.lat }
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.lon, point.lat)
    }
}

/// Approximates the point `distance_km` away from `start` along `bearing_deg`
/// (0 = north, clockwise).
///
/// This is a flat-earth offset scaled by the cosine of the start latitude, not
/// a geodesic. It is only meant to produce a query target for the routing
/// provider, which measures the real road distance. Undefined for a start
/// latitude of ±90°.
pub fn destination_point(start: GeoPoint, bearing_deg: f64, distance_km: f64) -> GeoPoint {
    let lat_deg_per_km = 1.0 / KM_PER_DEGREE;
    let lon_deg_per_km = 1.0 / (KM_PER_DEGREE * start.lat.to_radians().cos());

    let bearing = bearing_deg.to_radians();
    let north_km = distance_km * bearing.cos();
    let east_km = distance_km * bearing.sin();

    GeoPoint {
        lat: start.lat + north_km * lat_deg_per_km,
        lon: start.lon + east_km * lon_deg_per_km,
    }
}

/// `count` evenly spaced bearings starting at north, excluding 360°
pub fn bearings(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| i as f64 * 360.0 / count as f64)
        .collect()
}
