use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Config, ProviderKind};
use crate::destination::GeoPoint;

pub const ORS_DIRECTIONS_URL: &str =
    "https://api.openrouteservice.org/v2/directions/driving-car/geojson";
pub const GOOGLE_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Road-network distance between two points.
///
/// Implementations absorb every failure (network, HTTP status, API status,
/// malformed body, timeout) and answer `None`; callers treat all of those the
/// same way.
pub trait RoutingProvider {
    fn routable_distance_km(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> impl Future<Output = Option<f64>> + Send;
}

// Why a single directions request failed
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API status {0}")]
    Status(String),

    #[error("response has no {0}")]
    MissingField(&'static str),
}

// Reuse a single reqwest::Client for every request
lazy_static::lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::new();
}

fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}

fn absorb(provider: &str, destination: GeoPoint, result: Result<f64, RoutingError>) -> Option<f64> {
    match result {
        Ok(km) => {
            debug!(provider, %destination, km, "route found");
            Some(km)
        }
        Err(err) => {
            warn!(provider, %destination, "error calculating route: {err}");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrsDirections {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Debug, Deserialize)]
struct OrsFeature {
    properties: OrsProperties,
}

#[derive(Debug, Deserialize)]
struct OrsProperties {
    summary: OrsSummary,
}

#[derive(Debug, Deserialize)]
struct OrsSummary {
    distance: Option<f64>,
}

impl OrsDirections {
    pub fn distance_km(&self) -> Result<f64, RoutingError> {
        self.features
            .first()
            .and_then(|feature| feature.properties.summary.distance)
            .map(meters_to_km)
            .ok_or(RoutingError::MissingField("route summary distance"))
    }
}

/// Driving-car directions from openrouteservice.org
#[derive(Debug, Clone)]
pub struct OpenRouteService {
    api_key: String,
    timeout: Duration,
    url: String,
}

impl OpenRouteService {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            url: ORS_DIRECTIONS_URL.to_string(),
        }
    }

    /// Points the client at another directions endpoint, e.g. a self-hosted instance
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request(&self, origin: GeoPoint, destination: GeoPoint) -> reqwest::RequestBuilder {
        // ORS takes [lon, lat] pairs
        let body = serde_json::json!({
            "coordinates": [
                [origin.lon, origin.lat],
                [destination.lon, destination.lat],
            ]
        });

        CLIENT
            .post(&self.url)
            .header("Authorization", self.api_key.as_str())
            .json(&body)
            .timeout(self.timeout)
    }

    async fn directions(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<f64, RoutingError> {
        let response = self
            .request(origin, destination)
            .send()
            .await?
            .error_for_status()?;

        let route: OrsDirections = response.json().await?;
        route.distance_km()
    }
}

impl RoutingProvider for OpenRouteService {
    fn routable_distance_km(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> impl Future<Output = Option<f64>> + Send {
        async move {
            let result = self.directions(origin, destination).await;
            absorb("openrouteservice", destination, result)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GoogleDirections {
    status: String,
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Debug, Deserialize)]
struct GoogleRoute {
    #[serde(default)]
    legs: Vec<GoogleLeg>,
}

#[derive(Debug, Deserialize)]
struct GoogleLeg {
    distance: GoogleDistance,
}

#[derive(Debug, Deserialize)]
struct GoogleDistance {
    value: f64,
}

impl GoogleDirections {
    pub fn distance_km(&self) -> Result<f64, RoutingError> {
        if self.status != "OK" {
            return Err(RoutingError::Status(self.status.clone()));
        }
        self.routes
            .first()
            .and_then(|route| route.legs.first())
            .map(|leg| meters_to_km(leg.distance.value))
            .ok_or(RoutingError::MissingField("route leg distance"))
    }
}

/// Google Maps Directions API
#[derive(Debug, Clone)]
pub struct GoogleMaps {
    api_key: String,
    timeout: Duration,
    url: String,
}

impl GoogleMaps {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            url: GOOGLE_DIRECTIONS_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request(&self, origin: GeoPoint, destination: GeoPoint) -> reqwest::RequestBuilder {
        let origin = format!("{},{}", origin.lat, origin.lon);
        let destination = format!("{},{}", destination.lat, destination.lon);

        CLIENT
            .get(&self.url)
            .query(&[
                ("origin", origin.as_str()),
                ("destination", destination.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
    }

    async fn directions(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<f64, RoutingError> {
        let response = self
            .request(origin, destination)
            .send()
            .await?
            .error_for_status()?;

        let directions: GoogleDirections = response.json().await?;
        directions.distance_km()
    }
}

impl RoutingProvider for GoogleMaps {
    fn routable_distance_km(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> impl Future<Output = Option<f64>> + Send {
        async move {
            let result = self.directions(origin, destination).await;
            absorb("google", destination, result)
        }
    }
}

/// The backend picked for a run
#[derive(Debug, Clone)]
pub enum Provider {
    OpenRoute(OpenRouteService),
    Google(GoogleMaps),
}

impl Provider {
    pub fn from_config(config: &Config) -> Self {
        match config.provider {
            ProviderKind::OpenRouteService => Provider::OpenRoute(OpenRouteService::new(
                config.api_key.clone(),
                config.request_timeout,
            )),
            ProviderKind::Google => {
                Provider::Google(GoogleMaps::new(config.api_key.clone(), config.request_timeout))
            }
        }
    }
}

impl RoutingProvider for Provider {
    fn routable_distance_km(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> impl Future<Output = Option<f64>> + Send {
        async move {
            match self {
                Provider::OpenRoute(ors) => ors.routable_distance_km(origin, destination).await,
                Provider::Google(google) => google.routable_distance_km(origin, destination).await,
            }
        }
    }
}
