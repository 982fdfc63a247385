//! Profile similarity index over the full catalog, with an on-disk cache.
//!
//! The cache is two bincode artifacts, the fitted vectorizer and the row
//! matrix. Both carry a header with the format version and a fingerprint of
//! the catalog profiles they were built from, so a cache built for another
//! catalog (or by an older build) is rebuilt instead of trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::tfidf::{cosine_similarity, SparseVector, TfidfVectorizer};

pub const CACHE_FORMAT_VERSION: u32 = 1;
pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.bin";
pub const MATRIX_FILE: &str = "tfidf_matrix.bin";

#[derive(Error, Debug)]
pub enum IndexError {
  #[error("Failed to create cache directory {path}: {source}")]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("Failed to write cache file {path}: {source}")]
  Write { path: PathBuf, source: std::io::Error },

  #[error("Failed to encode cache artifact: {0}")]
  Encode(#[from] bincode::Error),
}

/// Why a cached index could not be reused
#[derive(Debug, Clone, PartialEq)]
pub enum CacheMiss {
  Missing,
  Unreadable(String),
  VersionMismatch { found: u32 },
  Stale,
  Forced,
}

impl fmt::Display for CacheMiss {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CacheMiss::Missing => write!(f, "cache files not found"),
      CacheMiss::Unreadable(reason) => write!(f, "cache unreadable ({reason})"),
      CacheMiss::VersionMismatch { found } => {
        write!(f, "cache format v{found}, expected v{CACHE_FORMAT_VERSION}")
      }
      CacheMiss::Stale => write!(f, "catalog changed since the cache was built"),
      CacheMiss::Forced => write!(f, "rebuild requested"),
    }
  }
}

/// Where a loaded index came from
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSource {
  Cache,
  Built(CacheMiss),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHeader {
  pub format_version: u32,
  pub fingerprint: String,
  pub rows: usize,
  pub built_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct VectorizerArtifact {
  header: CacheHeader,
  vectorizer: TfidfVectorizer,
}

#[derive(Serialize, Deserialize)]
struct MatrixArtifact {
  header: CacheHeader,
  rows: Vec<SparseVector>,
}

/// SHA-256 over every profile text, in catalog order
pub fn catalog_fingerprint(catalog: &Catalog) -> String {
  let mut hasher = Sha256::new();
  for profile in catalog.profile_texts() {
    hasher.update((profile.len() as u64).to_le_bytes());
    hasher.update(profile.as_bytes());
  }
  format!("{:x}", hasher.finalize())
}

/// TF-IDF vectors for every catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityIndex {
  vectorizer: TfidfVectorizer,
  rows: Vec<SparseVector>,
  fingerprint: String,
}

impl SimilarityIndex {
  /// Fit the vectorizer over the whole catalog
  pub fn build(catalog: &Catalog) -> Self {
    let (vectorizer, rows) = TfidfVectorizer::fit_transform(&catalog.profile_texts());
    Self { vectorizer, rows, fingerprint: catalog_fingerprint(catalog) }
  }

  pub fn vectorizer(&self) -> &TfidfVectorizer {
    &self.vectorizer
  }

  pub fn row(&self, row: usize) -> Option<&SparseVector> {
    self.rows.get(row)
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn fingerprint(&self) -> &str {
    &self.fingerprint
  }

  /// Cosine similarity between two catalog rows; 0 when either is out of range
  pub fn similarity(&self, a: usize, b: usize) -> f64 {
    match (self.rows.get(a), self.rows.get(b)) {
      (Some(a), Some(b)) => cosine_similarity(a, b),
      _ => 0.0,
    }
  }
}

/// The two cache artifacts inside a directory
#[derive(Debug, Clone)]
pub struct IndexCache {
  dir: PathBuf,
}

impl IndexCache {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn vectorizer_path(&self) -> PathBuf {
    self.dir.join(VECTORIZER_FILE)
  }

  pub fn matrix_path(&self) -> PathBuf {
    self.dir.join(MATRIX_FILE)
  }

  /// Load the cached index if it matches `catalog`
  pub fn load(&self, catalog: &Catalog) -> Result<SimilarityIndex, CacheMiss> {
    let vectorizer_path = self.vectorizer_path();
    let matrix_path = self.matrix_path();
    if !vectorizer_path.exists() || !matrix_path.exists() {
      return Err(CacheMiss::Missing);
    }

    let fingerprint = catalog_fingerprint(catalog);

    let vectorizer_bytes = read_artifact(&vectorizer_path)?;
    check_header(&decode_header(&vectorizer_bytes)?, &fingerprint, catalog.len())?;
    let vectorizer: VectorizerArtifact = decode(&vectorizer_bytes)?;

    let matrix_bytes = read_artifact(&matrix_path)?;
    check_header(&decode_header(&matrix_bytes)?, &fingerprint, catalog.len())?;
    let matrix: MatrixArtifact = decode(&matrix_bytes)?;

    if matrix.rows.len() != catalog.len() {
      return Err(CacheMiss::Unreadable(format!(
        "matrix has {} rows, catalog has {}",
        matrix.rows.len(),
        catalog.len()
      )));
    }

    Ok(SimilarityIndex { vectorizer: vectorizer.vectorizer, rows: matrix.rows, fingerprint })
  }

  /// Persist both artifacts, creating the cache directory when needed
  pub fn save(&self, index: &SimilarityIndex) -> Result<(), IndexError> {
    fs::create_dir_all(&self.dir)
      .map_err(|source| IndexError::CreateDir { path: self.dir.clone(), source })?;

    let header = CacheHeader {
      format_version: CACHE_FORMAT_VERSION,
      fingerprint: index.fingerprint.clone(),
      rows: index.rows.len(),
      built_at: Utc::now(),
    };

    let vectorizer =
      VectorizerArtifact { header: header.clone(), vectorizer: index.vectorizer.clone() };
    write_artifact(&self.vectorizer_path(), &bincode::serialize(&vectorizer)?)?;

    let matrix = MatrixArtifact { header, rows: index.rows.clone() };
    write_artifact(&self.matrix_path(), &bincode::serialize(&matrix)?)?;

    Ok(())
  }

  /// Reuse the cache when it is valid, otherwise build and persist a fresh index
  pub fn load_or_build(
    &self,
    catalog: &Catalog,
    force: bool,
  ) -> Result<(SimilarityIndex, IndexSource), IndexError> {
    let miss = if force {
      CacheMiss::Forced
    } else {
      match self.load(catalog) {
        Ok(index) => {
          info!("Loaded profile index from {}", self.dir.display());
          return Ok((index, IndexSource::Cache));
        }
        Err(miss) => miss,
      }
    };

    match &miss {
      CacheMiss::Missing | CacheMiss::Forced => info!("Building profile index: {}", miss),
      _ => warn!("Rebuilding profile index: {}", miss),
    }

    let index = SimilarityIndex::build(catalog);
    self.save(&index)?;
    info!(
      "Saved profile index ({} rows, {} terms) to {}",
      index.len(),
      index.vectorizer.vocabulary_size(),
      self.dir.display()
    );

    Ok((index, IndexSource::Built(miss)))
  }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, CacheMiss> {
  fs::read(path).map_err(|e| CacheMiss::Unreadable(format!("{}: {}", path.display(), e)))
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
  debug!("Writing {} bytes to {}", bytes.len(), path.display());
  fs::write(path, bytes).map_err(|source| IndexError::Write { path: path.to_path_buf(), source })
}

// The header leads every artifact, so it decodes even when the body layout changed
fn decode_header(bytes: &[u8]) -> Result<CacheHeader, CacheMiss> {
  decode(bytes)
}

fn decode<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T, CacheMiss> {
  bincode::deserialize(bytes).map_err(|e| CacheMiss::Unreadable(e.to_string()))
}

fn check_header(header: &CacheHeader, fingerprint: &str, rows: usize) -> Result<(), CacheMiss> {
  if header.format_version != CACHE_FORMAT_VERSION {
    return Err(CacheMiss::VersionMismatch { found: header.format_version });
  }
  if header.fingerprint != fingerprint || header.rows != rows {
    return Err(CacheMiss::Stale);
  }
  Ok(())
}
