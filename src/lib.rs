//! Reachable-area estimates for electric vehicles.
//!
//! For each of N evenly spaced bearings around a start point, a routing
//! provider is queried with a bounded binary search to find the furthest point
//! whose road distance still fits in the usable battery range. The boundary
//! points form a polygon that is written out as an interactive Leaflet map.

pub mod config;
pub mod destination;
pub mod error;
pub mod map;
pub mod routing;
pub mod search;

#[cfg(feature = "python")]
mod python;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub use config::{Config, Credentials, ProviderKind, RangeQuery, SearchSettings};
pub use destination::{bearings, destination_point, GeoPoint};
pub use error::{Error, Result};
pub use map::{RangeMap, RangePolygon};
pub use routing::{Provider, RoutingProvider};
pub use search::{find_boundary_point, find_boundary_points, BoundaryPoint};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RangeReport {
    pub boundary: Vec<BoundaryPoint>,
    pub directions: usize,
    pub area_km2: f64,
    pub output: PathBuf,
}

/// Searches the boundary and builds the range polygon, without rendering.
///
/// Fails with [`Error::InsufficientPoints`] when fewer than three bearings
/// found a reachable point.
pub async fn estimate_range<P>(
    provider: Arc<P>,
    query: &RangeQuery,
    settings: &SearchSettings,
) -> Result<RangePolygon>
where
    P: RoutingProvider + Send + Sync + 'static,
{
    info!(
        start = %query.start(),
        effective_range_km = query.effective_range_km(),
        directions = query.num_directions(),
        "finding boundary points"
    );

    let points = find_boundary_points(provider, query, settings).await;
    RangePolygon::new(points)
}

/// Estimates the range polygon and writes it as an HTML map to `output`.
///
/// Nothing is written when the polygon cannot be built.
pub async fn generate_range_map<P>(
    provider: Arc<P>,
    query: &RangeQuery,
    settings: &SearchSettings,
    output: &Path,
) -> Result<RangeReport>
where
    P: RoutingProvider + Send + Sync + 'static,
{
    let polygon = estimate_range(provider, query, settings).await?;
    let area_km2 = polygon.area_km2();
    let boundary = polygon.points().to_vec();

    let map = RangeMap::new(query.start(), query.battery_range_km(), polygon);
    map.save(output)?;

    info!(
        points = boundary.len(),
        area_km2,
        "range map saved to {}",
        output.display()
    );

    Ok(RangeReport {
        boundary,
        directions: query.num_directions(),
        area_km2,
        output: output.to_path_buf(),
    })
}

/// Runs a whole estimate as described by `config`, with the configured provider
pub async fn run(config: &Config) -> Result<RangeReport> {
    let provider = Arc::new(Provider::from_config(config));
    info!(provider = %config.provider, "generating EV range map");
    generate_range_map(provider, &config.query, &config.search, &config.output).await
}
