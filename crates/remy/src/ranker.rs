//! Hybrid recommendation pipeline: location filter, attribute filter,
//! profile similarity against a liked restaurant, and a blend with rating.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry, CatalogError};
use crate::config::Config;
use crate::fuzzy::{self, MATCH_THRESHOLD};
use crate::geo::{filter_by_location, GeoPoint, Nearby};
use crate::index::{IndexCache, IndexError, IndexSource, SimilarityIndex};

const SIMILARITY_WEIGHT: f64 = 0.5;
const RATING_WEIGHT: f64 = 0.5;

#[derive(Error, Debug)]
pub enum RecommenderError {
  #[error(transparent)]
  Catalog(#[from] CatalogError),

  #[error(transparent)]
  Index(#[from] IndexError),

  #[error("Similarity index has {index} rows but the catalog has {catalog}")]
  IndexMismatch { index: usize, catalog: usize },
}

/// One recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  pub origin: GeoPoint,
  /// Case-insensitive substring of the cuisine tags
  pub cuisine: String,
  /// Highest acceptable price for two
  pub budget: f64,
  /// Case-insensitive substring of the free-text info
  pub occasion: String,
  /// Name of a restaurant the user liked, matched approximately
  pub liked: Option<String>,
  pub top_n: usize,
  pub radius_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
  pub name: String,
  pub cuisine: Option<String>,
  pub price_for_two: Option<f64>,
  pub rating: Option<f64>,
  pub signature_dishes: Option<String>,
  pub location: Option<String>,
  pub special_features: Option<String>,
  pub distance_km: f64,
  pub similarity_score: f64,
  pub weighted_score: f64,
}

impl Recommendation {
  fn new(entry: &CatalogEntry, nearby: Nearby, similarity_score: f64, weighted_score: f64) -> Self {
    Self {
      name: entry.name.clone(),
      cuisine: entry.cuisine.clone(),
      price_for_two: entry.price_for_two,
      rating: entry.rating,
      signature_dishes: entry.signature_dishes.clone(),
      location: entry.location.clone(),
      special_features: entry.special_features.clone(),
      distance_km: nearby.distance_km,
      similarity_score,
      weighted_score,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
  pub items: Vec<Recommendation>,
  /// Rows that survived the location filter
  pub nearby_count: usize,
  /// Catalog name the liked restaurant resolved to
  pub reference: Option<String>,
}

impl Recommendations {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

/// 0.5 * similarity + 0.5 * rating fraction
pub fn weighted_score(similarity_score: f64, rating_fraction: f64) -> f64 {
  SIMILARITY_WEIGHT * similarity_score + RATING_WEIGHT * rating_fraction
}

/// A rating as a fraction of the best rating in the catalog, in [0, 1]
pub fn rating_fraction(rating: Option<f64>, max_rating: Option<f64>) -> f64 {
  match (rating, max_rating) {
    (Some(rating), Some(max)) if max > 0.0 => (rating / max).clamp(0.0, 1.0),
    _ => 0.0,
  }
}

fn contains_ignore_case(field: Option<&str>, needle: &str) -> bool {
  field.is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
}

/// Catalog and similarity index, loaded once and shared by every query
#[derive(Debug, Clone)]
pub struct Recommender {
  catalog: Catalog,
  index: SimilarityIndex,
}

impl Recommender {
  /// Build the similarity index in memory, no cache involved
  pub fn new(catalog: Catalog) -> Self {
    let index = SimilarityIndex::build(&catalog);
    Self { catalog, index }
  }

  pub fn with_index(catalog: Catalog, index: SimilarityIndex) -> Result<Self, RecommenderError> {
    if index.len() != catalog.len() {
      return Err(RecommenderError::IndexMismatch { index: index.len(), catalog: catalog.len() });
    }
    Ok(Self { catalog, index })
  }

  /// Load the configured catalog, then load or build its cached index
  pub fn load(config: &Config) -> Result<(Self, IndexSource), RecommenderError> {
    let catalog = Catalog::load(&config.catalog_path)?;
    info!("Loaded {} restaurants from {}", catalog.len(), config.catalog_path.display());

    let (index, source) = IndexCache::new(&config.cache_dir).load_or_build(&catalog, false)?;
    Ok((Self::with_index(catalog, index)?, source))
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub fn index(&self) -> &SimilarityIndex {
    &self.index
  }

  pub fn recommend(&self, query: &Query) -> Recommendations {
    let nearby = filter_by_location(query.origin, &self.catalog, query.radius_km);
    debug!("{} restaurants within {} km", nearby.len(), query.radius_km);

    if nearby.is_empty() {
      return Recommendations::default();
    }

    let candidates = self.candidates(&nearby, query);
    let reference = query.liked.as_deref().and_then(|liked| self.resolve_reference(liked));

    let max_rating = self.catalog.max_rating();
    let mut scored: Vec<(Nearby, &CatalogEntry, f64, f64)> = candidates
      .into_iter()
      .filter_map(|n| self.catalog.get(n.row).map(|entry| (n, entry)))
      .map(|(n, entry)| {
        let similarity = match reference {
          Some(reference_row) => self.index.similarity(reference_row, n.row),
          None => 1.0,
        };
        let weighted = weighted_score(similarity, rating_fraction(entry.rating, max_rating));
        (n, entry, similarity, weighted)
      })
      .collect();

    // equal scores fall back to name, then catalog order
    scored.sort_by(|a, b| {
      b.3
        .partial_cmp(&a.3)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.name.to_lowercase().cmp(&b.1.name.to_lowercase()))
        .then_with(|| a.0.row.cmp(&b.0.row))
    });

    let items = scored
      .into_iter()
      .take(query.top_n)
      .map(|(n, entry, similarity, weighted)| Recommendation::new(entry, n, similarity, weighted))
      .collect();

    Recommendations {
      items,
      nearby_count: nearby.len(),
      reference: reference.and_then(|row| self.catalog.get(row)).map(|e| e.name.clone()),
    }
  }

  /// Attribute filter, topped up with cuisine-only matches when it leaves fewer than `top_n`
  fn candidates(&self, nearby: &[Nearby], query: &Query) -> Vec<Nearby> {
    let cuisine_matches = |n: &Nearby| {
      self
        .catalog
        .get(n.row)
        .is_some_and(|entry| contains_ignore_case(entry.cuisine.as_deref(), &query.cuisine))
    };

    let mut candidates: Vec<Nearby> = nearby
      .iter()
      .copied()
      .filter(|n| cuisine_matches(n))
      .filter(|n| {
        self.catalog.get(n.row).is_some_and(|entry| {
          entry.price_for_two.is_some_and(|price| price <= query.budget)
            && contains_ignore_case(entry.more_info.as_deref(), &query.occasion)
        })
      })
      .collect();
    debug!("{} restaurants match cuisine, budget and occasion", candidates.len());

    if candidates.len() < query.top_n {
      let mut seen: HashSet<usize> = candidates.iter().map(|n| n.row).collect();
      let before = candidates.len();
      candidates
        .extend(nearby.iter().copied().filter(|n| cuisine_matches(n) && seen.insert(n.row)));
      debug!("Backfilled {} cuisine-only matches", candidates.len() - before);
    }

    candidates
  }

  /// Catalog row of the liked restaurant, when the name matches confidently
  fn resolve_reference(&self, liked: &str) -> Option<usize> {
    if liked.trim().is_empty() {
      return None;
    }

    match fuzzy::extract_one(liked, self.catalog.names()) {
      Some(m) if m.score >= MATCH_THRESHOLD => {
        info!("Matched '{}' to '{}' (score {})", liked, m.choice, m.score);
        self.catalog.position_of(m.choice)
      }
      Some(m) => {
        warn!("No confident match for '{}' (best '{}', score {})", liked, m.choice, m.score);
        None
      }
      None => {
        warn!("No confident match for '{}'", liked);
        None
      }
    }
  }
}
