use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ev_range::config::{
    load_env_file, Config, Credentials, ProviderKind, RangeQuery, SearchSettings,
    DEFAULT_DIRECTIONS, DEFAULT_EFFICIENCY_BUFFER_KM, DEFAULT_OUTPUT, DEFAULT_TIMEOUT,
    GOOGLE_API_KEY_VAR, ORS_API_KEY_VAR,
};
use ev_range::{Error, GeoPoint};

#[derive(Debug, Parser)]
#[command(
    name = "ev-range",
    version,
    about = "EV Range Visualization Tool",
    allow_negative_numbers = true
)]
struct Cli {
    /// Starting latitude
    #[arg(long)]
    lat: f64,

    /// Starting longitude
    #[arg(long)]
    lon: f64,

    /// Battery range in kilometers
    #[arg(long = "range")]
    range_km: f64,

    /// Safety buffer in kilometers
    #[arg(long, default_value_t = DEFAULT_EFFICIENCY_BUFFER_KM)]
    buffer: f64,

    /// Number of directions to check
    #[arg(long, default_value_t = DEFAULT_DIRECTIONS)]
    directions: usize,

    /// Routing service used to measure road distances
    #[arg(long, value_enum, default_value_t = ProviderKind::OpenRouteService)]
    provider: ProviderKind,

    /// Output HTML file
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Binary search steps (provider calls) per direction
    #[arg(long, default_value_t = SearchSettings::default().iterations)]
    iterations: u32,

    /// Initial search bound as a multiple of the effective range
    #[arg(long, default_value_t = SearchSettings::default().upper_bound_factor)]
    upper_bound_factor: f64,

    /// Directions searched in parallel
    #[arg(long, default_value_t = SearchSettings::default().concurrency)]
    concurrency: usize,

    /// Timeout for each routing request, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    #[arg(long, env = ORS_API_KEY_VAR, hide_env_values = true)]
    ors_api_key: Option<String>,

    #[arg(long, env = GOOGLE_API_KEY_VAR, hide_env_values = true)]
    google_api_key: Option<String>,
}

impl Cli {
    fn into_config(self) -> ev_range::Result<Config> {
        let query = RangeQuery::new(
            GeoPoint::new(self.lat, self.lon),
            self.range_km,
            self.buffer,
            self.directions,
        )?;

        let search = SearchSettings {
            iterations: self.iterations,
            upper_bound_factor: self.upper_bound_factor,
            concurrency: self.concurrency,
        };

        let credentials = Credentials {
            ors_api_key: self.ors_api_key,
            google_api_key: self.google_api_key,
        };

        Config::new(
            query,
            search,
            self.provider,
            &credentials,
            self.output,
            Duration::from_secs(self.timeout_secs),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // before parsing, so API keys from .env reach the env-backed flags
    load_env_file(None);

    let config = Cli::parse().into_config().context("invalid configuration")?;

    match ev_range::run(&config).await {
        Ok(report) => {
            info!(
                "EV range map with {} of {} boundary points saved to {}",
                report.boundary.len(),
                report.directions,
                report.output.display()
            );
            info!("Open this file in a web browser to view the visualization.");
            Ok(())
        }
        Err(err @ Error::InsufficientPoints { .. }) => {
            error!("{err}; no map was written");
            Err(err).context("range estimate failed")
        }
        Err(err) => Err(err).context("range estimate failed"),
    }
}
