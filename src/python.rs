use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::{
    load_env_file, Config, Credentials, ProviderKind, RangeQuery, SearchSettings, DEFAULT_OUTPUT,
    DEFAULT_TIMEOUT,
};
use crate::destination::GeoPoint;
use crate::error::Error;
use crate::routing::Provider;

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::InsufficientPoints { .. } | Error::WriteMap { .. } | Error::Json(_) => {
            PyRuntimeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Calculates the EV range polygon around a point and returns it as GeoJSON
#[pyfunction]
#[pyo3(signature = (lat, lon, battery_range, efficiency_buffer = 10.0, num_directions = 16, provider = "openrouteservice"))]
fn calc_range_polygon(
    lat: f64,
    lon: f64,
    battery_range: f64,
    efficiency_buffer: f64,
    num_directions: usize,
    provider: &str,
) -> PyResult<String> {
    let provider_kind = match provider {
        "openrouteservice" | "ors" => ProviderKind::OpenRouteService,
        "google" => ProviderKind::Google,
        _ => return Err(PyValueError::new_err("Invalid provider")),
    };

    let query = RangeQuery::new(
        GeoPoint::new(lat, lon),
        battery_range,
        efficiency_buffer,
        num_directions,
    )
    .map_err(to_py_err)?;

    load_env_file(None);
    let config = Config::new(
        query,
        SearchSettings::default(),
        provider_kind,
        &Credentials::from_env(),
        DEFAULT_OUTPUT.into(),
        DEFAULT_TIMEOUT,
    )
    .map_err(to_py_err)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    let polygon = rt
        .block_on(crate::estimate_range(
            Arc::new(Provider::from_config(&config)),
            &config.query,
            &config.search,
        ))
        .map_err(to_py_err)?;

    serde_json::to_string(&polygon.to_oriented_geometry()).map_err(|err| to_py_err(err.into()))
}

/// Python module for estimating EV range polygons
#[pymodule]
fn ev_range(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(calc_range_polygon, m)?)?;
    Ok(())
}
