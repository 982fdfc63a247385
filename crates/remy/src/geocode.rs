//! Address lookup against a LocationIQ-style search endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::geo::GeoPoint;

#[derive(Error, Debug)]
pub enum GeocodeError {
  #[error("Invalid geocoding URL '{url}': {source}")]
  InvalidUrl { url: String, source: url::ParseError },

  #[error("Geocoding request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Geocoding service returned {0}")]
  Status(reqwest::StatusCode),

  #[error("Malformed geocoding response: {0}")]
  Decode(String),

  #[error("Invalid coordinate '{0}' in geocoding response")]
  InvalidCoordinate(String),
}

/// Turns a free-text address into coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
  /// Look up `address`, returning `None` when the service had no match.
  async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError>;

  /// Like [`Geocoder::lookup`], but every failure is logged and reported as "no result".
  async fn resolve(&self, address: &str) -> Option<GeoPoint> {
    match self.lookup(address).await {
      Ok(Some(point)) => Some(point),
      Ok(None) => {
        warn!("No geocoding results for '{}'", address);
        None
      }
      Err(e) => {
        warn!("Error fetching geocode for '{}': {}", address, e);
        None
      }
    }
  }
}

pub struct LocationIqGeocoder {
  client: Client,
  base_url: String,
  api_key: String,
}

// the API key stays out of debug output
impl fmt::Debug for LocationIqGeocoder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LocationIqGeocoder").field("base_url", &self.base_url).finish_non_exhaustive()
  }
}

impl LocationIqGeocoder {
  pub fn new(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
    timeout_secs: u64,
  ) -> Result<Self, GeocodeError> {
    let client = Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?;
    Ok(Self { client, base_url: base_url.into(), api_key: api_key.into() })
  }

  pub fn from_config(config: &Config, api_key: impl Into<String>) -> Result<Self, GeocodeError> {
    Self::new(config.geocoding_url.clone(), api_key, config.geocoding_timeout_secs)
  }

  fn search_url(&self, address: &str) -> Result<Url, GeocodeError> {
    Url::parse_with_params(
      &self.base_url,
      &[("key", self.api_key.as_str()), ("q", address), ("format", "json")],
    )
    .map_err(|source| GeocodeError::InvalidUrl { url: self.base_url.clone(), source })
  }
}

#[async_trait]
impl Geocoder for LocationIqGeocoder {
  async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
    let url = self.search_url(address)?;
    debug!("Geocoding '{}'", address);

    let response = self.client.get(url).send().await?;
    if !response.status().is_success() {
      return Err(GeocodeError::Status(response.status()));
    }

    let body = response.text().await?;
    let places: Value =
      serde_json::from_str(&body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

    first_place_coordinates(&places)
  }
}

/// Coordinates of the first place in a search response
pub fn first_place_coordinates(places: &Value) -> Result<Option<GeoPoint>, GeocodeError> {
  let places =
    places.as_array().ok_or_else(|| GeocodeError::Decode("expected a JSON array".to_string()))?;

  let Some(first) = places.first() else {
    return Ok(None);
  };

  let latitude = coordinate(first, "lat")?;
  let longitude = coordinate(first, "lon")?;
  Ok(Some(GeoPoint::new(latitude, longitude)))
}

// LocationIQ sends coordinates as decimal strings; plain numbers are accepted too
fn coordinate(place: &Value, field: &str) -> Result<f64, GeocodeError> {
  let value = match place.get(field) {
    Some(Value::String(s)) => {
      s.trim().parse::<f64>().map_err(|_| GeocodeError::InvalidCoordinate(s.clone()))?
    }
    Some(Value::Number(n)) => {
      n.as_f64().ok_or_else(|| GeocodeError::InvalidCoordinate(n.to_string()))?
    }
    Some(other) => return Err(GeocodeError::InvalidCoordinate(other.to_string())),
    None => return Err(GeocodeError::Decode(format!("first result has no '{field}' field"))),
  };

  if value.is_finite() {
    Ok(value)
  } else {
    Err(GeocodeError::InvalidCoordinate(value.to_string()))
  }
}
