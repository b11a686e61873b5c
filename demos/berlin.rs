//! Runs an EV range estimate for Berlin through the library API.
//!
//! Needs `ORS_API_KEY` in the environment or a `.env` file:
//!
//! ```sh
//! ORS_API_KEY=... cargo run --example berlin
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use ev_range::config::{load_env_file, DEFAULT_TIMEOUT};
use ev_range::{Config, Credentials, GeoPoint, ProviderKind, RangeQuery, SearchSettings};

const LOCATIONS: [(&str, GeoPoint); 5] = [
    ("San Francisco", GeoPoint { lat: 37.7749, lon: -122.4194 }),
    ("New York", GeoPoint { lat: 40.7128, lon: -74.0060 }),
    ("London", GeoPoint { lat: 51.5074, lon: -0.1278 }),
    ("Tokyo", GeoPoint { lat: 35.6762, lon: 139.6503 }),
    ("Berlin", GeoPoint { lat: 52.5200, lon: 13.4050 }),
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();
    load_env_file(None);

    let name = "Berlin";
    let (_, start) = LOCATIONS
        .iter()
        .find(|(city, _)| *city == name)
        .context("unknown location")?;

    let battery_range_km = 150.0;
    info!("Calculating EV range for {name} with {battery_range_km} km range...");

    // more directions for a smoother polygon
    let query = RangeQuery::new(*start, battery_range_km, 10.0, 24)?;
    let output = PathBuf::from(format!("ev_range_{}.html", name.to_lowercase()));

    let config = Config::new(
        query,
        SearchSettings::default(),
        ProviderKind::OpenRouteService,
        &Credentials::from_env(),
        output,
        DEFAULT_TIMEOUT,
    )?;

    let report = ev_range::run(&config).await?;
    info!("Range map saved to {}", report.output.display());
    info!("Open this file in a web browser to view the visualization.");

    Ok(())
}
