use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geo::GeoPoint;

/// Columns every catalog file has to provide
pub const REQUIRED_COLUMNS: &[&str] = &[
  "Names",
  "Cuisine",
  "Price_For_Two",
  "Signature_Dishes",
  "Special_Features",
  "More_Info",
  "Ratings",
  "Location",
  "latitude",
  "longitude",
];

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("Failed to open catalog {path}: {source}")]
  Open { path: PathBuf, source: std::io::Error },

  #[error("Failed to read catalog header: {source}")]
  Header { source: csv::Error },

  #[error("Catalog is missing required column '{column}'")]
  MissingColumn { column: String },

  #[error("Failed to read catalog row {row}: {source}")]
  Row { row: usize, source: csv::Error },
}

impl CatalogError {
  pub fn missing_column(column: impl Into<String>) -> Self {
    Self::MissingColumn { column: column.into() }
  }
}

/// A single restaurant row. Everything but the name may be absent in the source table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogEntry {
  #[serde(rename = "Names")]
  pub name: String,
  #[serde(rename = "Cuisine")]
  pub cuisine: Option<String>,
  #[serde(rename = "Price_For_Two", deserialize_with = "csv::invalid_option")]
  pub price_for_two: Option<f64>,
  #[serde(rename = "Signature_Dishes")]
  pub signature_dishes: Option<String>,
  #[serde(rename = "Special_Features")]
  pub special_features: Option<String>,
  #[serde(rename = "More_Info")]
  pub more_info: Option<String>,
  #[serde(rename = "Ratings", deserialize_with = "csv::invalid_option")]
  pub rating: Option<f64>,
  #[serde(rename = "Location")]
  pub location: Option<String>,
  #[serde(rename = "latitude", deserialize_with = "csv::invalid_option")]
  pub latitude: Option<f64>,
  #[serde(rename = "longitude", deserialize_with = "csv::invalid_option")]
  pub longitude: Option<f64>,
}

impl CatalogEntry {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  /// Coordinates of this restaurant, if both are present and finite
  pub fn coordinates(&self) -> Option<GeoPoint> {
    match (self.latitude, self.longitude) {
      (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
        Some(GeoPoint::new(latitude, longitude))
      }
      _ => None,
    }
  }

  /// Descriptive text the similarity index is fitted on
  pub fn profile_text(&self) -> String {
    let price = self.price_for_two.map(format_price).unwrap_or_default();

    [
      self.cuisine.as_deref().unwrap_or(""),
      price.as_str(),
      self.signature_dishes.as_deref().unwrap_or(""),
      self.special_features.as_deref().unwrap_or(""),
      self.more_info.as_deref().unwrap_or(""),
    ]
    .join(" ")
  }

  // NaN and infinities parse fine as f64 but mean "missing" in a catalog
  fn sanitize(mut self) -> Self {
    let values =
      [&mut self.price_for_two, &mut self.rating, &mut self.latitude, &mut self.longitude];
    for value in values {
      if value.is_some_and(|v| !v.is_finite()) {
        *value = None;
      }
    }
    self
  }
}

/// Render a price the way it appears in the source table (`800`, not `800.0`)
pub fn format_price(price: f64) -> String {
  if price.fract() == 0.0 && price.abs() < 1e15 {
    format!("{}", price as i64)
  } else {
    price.to_string()
  }
}

/// The full restaurant table, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
  entries: Vec<CatalogEntry>,
}

impl Catalog {
  pub fn new(entries: Vec<CatalogEntry>) -> Self {
    Self { entries: entries.into_iter().map(CatalogEntry::sanitize).collect() }
  }

  /// Load a catalog from a CSV file on disk
  pub fn load(path: &Path) -> Result<Self, CatalogError> {
    let file =
      File::open(path).map_err(|source| CatalogError::Open { path: path.to_path_buf(), source })?;
    Self::from_reader(file)
  }

  /// Parse a catalog from any CSV source with a header row
  pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
    let mut reader =
      csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader);

    let headers = reader.headers().map_err(|source| CatalogError::Header { source })?.clone();
    for column in REQUIRED_COLUMNS {
      if !headers.iter().any(|header| header == *column) {
        return Err(CatalogError::missing_column(*column));
      }
    }

    let mut entries = Vec::new();
    for (i, record) in reader.deserialize::<CatalogEntry>().enumerate() {
      let entry = record.map_err(|source| CatalogError::Row { row: i + 1, source })?;
      entries.push(entry);
    }

    Ok(Self::new(entries))
  }

  pub fn entries(&self) -> &[CatalogEntry] {
    &self.entries
  }

  pub fn get(&self, row: usize) -> Option<&CatalogEntry> {
    self.entries.get(row)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
    self.entries.iter()
  }

  /// Highest rating in the whole catalog
  pub fn max_rating(&self) -> Option<f64> {
    self.entries.iter().filter_map(|entry| entry.rating).reduce(f64::max)
  }

  /// First row carrying exactly this name
  pub fn position_of(&self, name: &str) -> Option<usize> {
    self.entries.iter().position(|entry| entry.name == name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|entry| entry.name.as_str())
  }

  pub fn profile_texts(&self) -> Vec<String> {
    self.entries.iter().map(CatalogEntry::profile_text).collect()
  }
}
