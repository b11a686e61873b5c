use std::io;
use std::path::PathBuf;

use crate::config::ProviderKind;

/// Errors surfaced to the caller of a range estimate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{var} is not set; it is required by the {provider} provider (set it in the environment or a .env file)")]
    MissingApiKey {
        var: &'static str,
        provider: ProviderKind,
    },

    #[error(
        "effective range must be positive (battery range {battery_range_km} km minus buffer {efficiency_buffer_km} km)"
    )]
    NonPositiveRange {
        battery_range_km: f64,
        efficiency_buffer_km: f64,
    },

    #[error("at least 3 directions are needed to enclose an area, got {0}")]
    TooFewDirections(usize),

    #[error("invalid start point ({lat}, {lon}); latitude must be inside (-90, 90) and longitude inside [-180, 180]")]
    InvalidStart { lat: f64, lon: f64 },

    #[error("invalid search setting: {0}")]
    InvalidSetting(&'static str),

    /// Fewer than three bearings produced a boundary point
    #[error("only {found} boundary points found, at least 3 are needed to build a range polygon")]
    InsufficientPoints { found: usize },

    #[error("failed to write map to {}: {source}", path.display())]
    WriteMap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize map layers: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
