use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::destination::GeoPoint;
use crate::error::{Error, Result};

pub const ORS_API_KEY_VAR: &str = "ORS_API_KEY";
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";

pub const DEFAULT_EFFICIENCY_BUFFER_KM: f64 = 10.0;
pub const DEFAULT_DIRECTIONS: usize = 16;
pub const DEFAULT_OUTPUT: &str = "ev_range_map.html";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which routing backend answers distance queries for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProviderKind {
    #[default]
    #[value(name = "openrouteservice", alias = "ors")]
    OpenRouteService,
    #[value(name = "google")]
    Google,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key
    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::OpenRouteService => ORS_API_KEY_VAR,
            ProviderKind::Google => GOOGLE_API_KEY_VAR,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenRouteService => write!(f, "OpenRouteService"),
            ProviderKind::Google => write!(f, "Google Directions"),
        }
    }
}

/// The starting point and range budget of an estimate
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    start: GeoPoint,
    battery_range_km: f64,
    efficiency_buffer_km: f64,
    num_directions: usize,
}

impl RangeQuery {
    pub fn new(
        start: GeoPoint,
        battery_range_km: f64,
        efficiency_buffer_km: f64,
        num_directions: usize,
    ) -> Result<Self> {
        let valid_lat = start.lat.is_finite() && start.lat.abs() < 90.0;
        let valid_lon = start.lon.is_finite() && start.lon.abs() <= 180.0;
        if !valid_lat || !valid_lon {
            return Err(Error::InvalidStart {
                lat: start.lat,
                lon: start.lon,
            });
        }

        let effective = battery_range_km - efficiency_buffer_km;
        if !effective.is_finite() || effective <= 0.0 {
            return Err(Error::NonPositiveRange {
                battery_range_km,
                efficiency_buffer_km,
            });
        }

        if num_directions < 3 {
            return Err(Error::TooFewDirections(num_directions));
        }

        Ok(Self {
            start,
            battery_range_km,
            efficiency_buffer_km,
            num_directions,
        })
    }

    pub fn start(&self) -> GeoPoint {
        self.start
    }

    pub fn battery_range_km(&self) -> f64 {
        self.battery_range_km
    }

    /// Battery range minus the efficiency buffer; always positive
    pub fn effective_range_km(&self) -> f64 {
        self.battery_range_km - self.efficiency_buffer_km
    }

    pub fn num_directions(&self) -> usize {
        self.num_directions
    }
}

/// Tuning of the per-bearing binary search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Provider calls per bearing. There is no early exit.
    pub iterations: u32,
    /// Initial upper bound as a multiple of the effective range
    pub upper_bound_factor: f64,
    /// Bearings searched at the same time
    pub concurrency: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            iterations: 10,
            upper_bound_factor: 1.5,
            concurrency: 1,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidSetting("iterations must be at least 1"));
        }
        if !self.upper_bound_factor.is_finite() || self.upper_bound_factor <= 0.0 {
            return Err(Error::InvalidSetting(
                "upper bound factor must be a positive number",
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidSetting("concurrency must be at least 1"));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(Error::InvalidSetting("concurrency is too large"));
        }
        Ok(())
    }
}

/// API keys for both providers; only the selected one has to be present
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub ors_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            ors_api_key: non_empty_var(ORS_API_KEY_VAR),
            google_api_key: non_empty_var(GOOGLE_API_KEY_VAR),
        }
    }

    fn key_for(&self, provider: ProviderKind) -> Option<&str> {
        let key = match provider {
            ProviderKind::OpenRouteService => self.ors_api_key.as_deref(),
            ProviderKind::Google => self.google_api_key.as_deref(),
        };
        key.filter(|key| !key.trim().is_empty())
    }
}

/// Loads variables from a `.env` file into the process environment.
///
/// With no path, `.env` is looked up from the current directory upwards.
/// Variables already set in the environment win. Returns the file that was
/// read, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => {
            debug!("loaded environment from {}", path.display());
            Some(path)
        }
        Err(err) if err.not_found() => None,
        Err(err) => {
            warn!("ignoring env file: {err}");
            None
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Everything a run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub query: RangeQuery,
    pub search: SearchSettings,
    pub provider: ProviderKind,
    pub api_key: String,
    pub output: PathBuf,
    pub request_timeout: Duration,
}

impl Config {
    pub fn new(
        query: RangeQuery,
        search: SearchSettings,
        provider: ProviderKind,
        credentials: &Credentials,
        output: PathBuf,
        request_timeout: Duration,
    ) -> Result<Self> {
        search.validate()?;
        if request_timeout.is_zero() {
            return Err(Error::InvalidSetting("request timeout must be positive"));
        }

        let api_key = credentials
            .key_for(provider)
            .ok_or(Error::MissingApiKey {
                var: provider.api_key_var(),
                provider,
            })?
            .to_string();

        Ok(Self {
            query,
            search,
            provider,
            api_key,
            output,
            request_timeout,
        })
    }
}
