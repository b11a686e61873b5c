use std::fs;
use std::path::Path;

use geo::orient::{Direction, Orient};
use geo::{GeodesicArea, LineString, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde_json::json;

use crate::destination::GeoPoint;
use crate::error::{Error, Result};
use crate::search::BoundaryPoint;

const ZOOM_START: u8 = 10;
const RANGE_COLOR: &str = "#3388ff";

/// Boundary points in bearing order, read as a closed ring
#[derive(Debug, Clone, PartialEq)]
pub struct RangePolygon {
    points: Vec<BoundaryPoint>,
}

impl RangePolygon {
    /// Fails with [`Error::InsufficientPoints`] below three points
    pub fn new(mut points: Vec<BoundaryPoint>) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::InsufficientPoints {
                found: points.len(),
            });
        }
        points.sort_by(|a, b| a.bearing.total_cmp(&b.bearing));
        Ok(Self { points })
    }

    pub fn points(&self) -> &[BoundaryPoint] {
        &self.points
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let ring: LineString<f64> = self.points.iter().map(|p| geo::Coord::from(p.point)).collect();
        Polygon::new(ring, vec![])
    }

    /// Same ring with a counter-clockwise exterior. Bearing order runs
    /// clockwise, which geodesic area reads as the rest of the globe.
    pub fn to_oriented_polygon(&self) -> Polygon<f64> {
        self.to_polygon().orient(Direction::Default)
    }

    /// Area enclosed by the ring on the WGS84 ellipsoid
    pub fn area_km2(&self) -> f64 {
        self.to_oriented_polygon().geodesic_area_unsigned() / 1_000_000.0
    }

    /// The ring in bearing order as a GeoJSON polygon, first point repeated at the end
    pub fn to_geometry(&self) -> Geometry {
        Geometry::new(Value::from(&self.to_polygon()))
    }

    /// RFC 7946 winding (counter-clockwise exterior) for consumers outside the map
    pub fn to_oriented_geometry(&self) -> Geometry {
        Geometry::new(Value::from(&self.to_oriented_polygon()))
    }
}

fn properties(value: JsonValue) -> Option<JsonObject> {
    match value {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}

fn feature(geometry: Geometry, props: JsonValue) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: properties(props),
        foreign_members: None,
    }
}

fn point_geometry(point: GeoPoint) -> Geometry {
    Geometry::new(Value::Point(vec![point.lon, point.lat]))
}

/// Start marker, range polygon and boundary markers ready to be drawn
#[derive(Debug, Clone)]
pub struct RangeMap {
    start: GeoPoint,
    battery_range_km: f64,
    polygon: RangePolygon,
}

impl RangeMap {
    pub fn new(start: GeoPoint, battery_range_km: f64, polygon: RangePolygon) -> Self {
        Self {
            start,
            battery_range_km,
            polygon,
        }
    }

    /// Layers in drawing order: start, range polygon, one marker per boundary point
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.polygon.points().len() + 2);

        features.push(feature(
            point_geometry(self.start),
            json!({
                "kind": "start",
                "popup": format!("Start: {}", self.start),
            }),
        ));

        features.push(feature(
            self.polygon.to_geometry(),
            json!({
                "kind": "range",
                "name": format!("EV Range ({} km)", self.battery_range_km),
                "popup": format!("EV Range ({} km)", self.battery_range_km),
                "style": {
                    "fillColor": RANGE_COLOR,
                    "color": RANGE_COLOR,
                    "weight": 2,
                    "fillOpacity": 0.4,
                },
            }),
        ));

        for (i, boundary) in self.polygon.points().iter().enumerate() {
            features.push(feature(
                point_geometry(boundary.point),
                json!({
                    "kind": "boundary",
                    "bearing": boundary.bearing,
                    "route_km": boundary.route_km,
                    "popup": format!("Boundary Point {}: {}", i + 1, boundary.point),
                }),
            ));
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    /// A standalone Leaflet page centered on the start point
    pub fn to_html(&self) -> Result<String> {
        let layers = serde_json::to_string(&self.to_feature_collection())?;
        // keep the inline script from being closed early
        let layers = layers.replace("</", "<\\/");

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1.0"/>
<title>EV Range ({range} km)</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"/>
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; width: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const layers = {layers};
const map = L.map("map").setView([{lat}, {lon}], {zoom});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
L.geoJSON(layers, {{
  style: (feature) => feature.properties.style,
  pointToLayer: (feature, latlng) => feature.properties.kind === "start"
    ? L.marker(latlng)
    : L.circleMarker(latlng, {{ radius: 4, color: "blue", fill: true, fillColor: "blue" }}),
  onEachFeature: (feature, layer) => layer.bindPopup(feature.properties.popup)
}}).addTo(map);
</script>
</body>
</html>
"#,
            range = self.battery_range_km,
            layers = layers,
            lat = self.start.lat,
            lon = self.start.lon,
            zoom = ZOOM_START,
        ))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let html = self.to_html()?;
        fs::write(path, html).map_err(|source| Error::WriteMap {
            path: path.to_path_buf(),
            source,
        })
    }
}
