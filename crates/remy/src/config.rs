//! Configuration management for Remy
//!
//! Settings come from a YAML file (explicit path, or the first of the
//! well-known locations that exists), then `REMY_*` environment variables,
//! then whatever the command line overrides.

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geo::DEFAULT_RADIUS_KM;

pub const DEFAULT_GEOCODING_URL: &str = "https://us1.locationiq.com/v1/search.php";
pub const DEFAULT_TOP_N: usize = 5;

/// Files checked, in order, when no explicit config path is given
const CONFIG_FILES: &[&str] = &[".remy.yaml", "remy.yaml"];

pub const ENV_CATALOG_PATH: &str = "REMY_CATALOG_PATH";
pub const ENV_CACHE_DIR: &str = "REMY_CACHE_DIR";
pub const ENV_GEOCODING_API_KEY: &str = "REMY_GEOCODING_API_KEY";
pub const ENV_GEOCODING_URL: &str = "REMY_GEOCODING_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Config file not found: {0}")]
  NotFound(PathBuf),

  #[error("Failed to read config file {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },

  #[error("Failed to parse config file {path}: {source}")]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("Invalid configuration: {0}")]
  Invalid(String),
}

impl ConfigError {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::Invalid(message.into())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// CSV file holding the restaurant table
  pub catalog_path: PathBuf,
  /// Directory for the cached profile index
  pub cache_dir: PathBuf,
  pub geocoding_api_key: Option<String>,
  pub geocoding_url: String,
  pub geocoding_timeout_secs: u64,
  pub default_radius_km: f64,
  pub default_top_n: usize,
}

fn default_cache_dir() -> PathBuf {
  match home_dir() {
    Some(home) => home.join(".remy").join("cache"),
    None => PathBuf::from(".remy").join("cache"),
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      catalog_path: PathBuf::from("preprocessed_data.csv"),
      cache_dir: default_cache_dir(),
      geocoding_api_key: None,
      geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
      geocoding_timeout_secs: 30,
      default_radius_km: DEFAULT_RADIUS_KM,
      default_top_n: DEFAULT_TOP_N,
    }
  }
}

impl Config {
  /// Load configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&content)
      .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Resolve the effective configuration: file, then environment, then validation.
  ///
  /// An explicit path has to exist; otherwise the well-known locations are
  /// tried and the defaults used when none is present.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let config = match explicit {
      Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
      Some(path) => Self::load_from_file(path)?,
      None => match Self::discover() {
        Some(path) => Self::load_from_file(path)?,
        None => Self::default(),
      },
    };

    let config = config.with_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
  }

  fn discover() -> Option<PathBuf> {
    let home_config = home_dir().map(|home| home.join(".remy").join("config.yaml"));

    CONFIG_FILES.iter().map(PathBuf::from).chain(home_config).find(|path| path.exists())
  }

  /// Apply `REMY_*` overrides, reading variables through `lookup`
  pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(path) = lookup(ENV_CATALOG_PATH) {
      self.catalog_path = PathBuf::from(path);
    }
    if let Some(dir) = lookup(ENV_CACHE_DIR) {
      self.cache_dir = PathBuf::from(dir);
    }
    if let Some(key) = lookup(ENV_GEOCODING_API_KEY) {
      self.geocoding_api_key = Some(key);
    }
    if let Some(url) = lookup(ENV_GEOCODING_URL) {
      self.geocoding_url = url;
    }
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    validate_radius(self.default_radius_km)?;
    if self.default_top_n == 0 {
      return Err(ConfigError::invalid("default_top_n must be greater than zero"));
    }
    if self.geocoding_timeout_secs == 0 {
      return Err(ConfigError::invalid("geocoding_timeout_secs must be greater than zero"));
    }
    Ok(())
  }
}

pub fn validate_radius(radius_km: f64) -> Result<(), ConfigError> {
  if !radius_km.is_finite() || radius_km <= 0.0 {
    return Err(ConfigError::invalid(format!("radius must be a positive number, got {radius_km}")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::fs;
  use tempfile::TempDir;

  fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.catalog_path, PathBuf::from("preprocessed_data.csv"));
    assert_eq!(config.default_radius_km, 7.0);
    assert_eq!(config.default_top_n, 5);
    assert_eq!(config.geocoding_timeout_secs, 30);
    assert_eq!(config.geocoding_url, DEFAULT_GEOCODING_URL);
    assert!(config.geocoding_api_key.is_none());
    assert!(config.cache_dir.ends_with(".remy/cache"));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("remy.yaml");
    fs::write(&path, "catalog_path: data/restaurants.csv\ndefault_top_n: 10\n").unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.catalog_path, PathBuf::from("data/restaurants.csv"));
    assert_eq!(config.default_top_n, 10);
    assert_eq!(config.default_radius_km, 7.0);
  }

  #[test]
  fn test_explicit_missing_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(Some(&temp.path().join("nope.yaml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
  }

  #[test]
  fn test_malformed_yaml_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("remy.yaml");
    fs::write(&path, "default_top_n: [not, a, number]\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }

  #[test]
  fn test_env_overrides() {
    let config = Config::default().with_env_overrides(env(&[
      (ENV_CATALOG_PATH, "/data/catalog.csv"),
      (ENV_CACHE_DIR, "/tmp/remy"),
      (ENV_GEOCODING_API_KEY, "pk.test"),
      (ENV_GEOCODING_URL, "http://localhost:1234/search"),
    ]));

    assert_eq!(config.catalog_path, PathBuf::from("/data/catalog.csv"));
    assert_eq!(config.cache_dir, PathBuf::from("/tmp/remy"));
    assert_eq!(config.geocoding_api_key.as_deref(), Some("pk.test"));
    assert_eq!(config.geocoding_url, "http://localhost:1234/search");
  }

  #[test]
  fn test_blank_env_values_are_ignored() {
    let config = Config::default().with_env_overrides(env(&[(ENV_GEOCODING_API_KEY, "  ")]));
    assert!(config.geocoding_api_key.is_none());
  }

  #[test]
  fn test_validation() {
    let bad_radius = Config { default_radius_km: 0.0, ..Config::default() };
    assert!(bad_radius.validate().is_err());

    let nan_radius = Config { default_radius_km: f64::NAN, ..Config::default() };
    assert!(nan_radius.validate().is_err());

    let bad_top_n = Config { default_top_n: 0, ..Config::default() };
    assert!(bad_top_n.validate().is_err());

    let bad_timeout = Config { geocoding_timeout_secs: 0, ..Config::default() };
    assert!(bad_timeout.validate().is_err());
  }
}
