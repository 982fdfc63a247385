//! TF-IDF vectorization of restaurant profiles.
//!
//! Smoothed idf (`ln((1 + n) / (1 + df)) + 1`), raw term counts, and L2
//! normalized rows, so cosine similarity of two rows is just their dot product.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::text::tokenize;

/// A sparse row: column indices in ascending order with their weights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
  pub indices: Vec<usize>,
  pub values: Vec<f64>,
}

impl SparseVector {
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn nnz(&self) -> usize {
    self.indices.len()
  }

  pub fn norm(&self) -> f64 {
    self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
  }

  pub fn dot(&self, other: &SparseVector) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < self.indices.len() && j < other.indices.len() {
      match self.indices[i].cmp(&other.indices[j]) {
        std::cmp::Ordering::Less => i += 1,
        std::cmp::Ordering::Greater => j += 1,
        std::cmp::Ordering::Equal => {
          sum += self.values[i] * other.values[j];
          i += 1;
          j += 1;
        }
      }
    }
    sum
  }
}

/// Calculate cosine similarity between two sparse vectors; zero vectors are similar to nothing
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
  let norm_a = a.norm();
  let norm_b = b.norm();

  if norm_a == 0.0 || norm_b == 0.0 {
    0.0
  } else {
    a.dot(b) / (norm_a * norm_b)
  }
}

/// Fitted vocabulary and idf weights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
  vocabulary: BTreeMap<String, usize>,
  idf: Vec<f64>,
}

impl TfidfVectorizer {
  /// Learn the vocabulary and idf weights from `documents`
  pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
    let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();
    Self::fit_tokenized(&tokenized)
  }

  /// Fit on `documents` and return the vector of each one
  pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVector>) {
    let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();
    let vectorizer = Self::fit_tokenized(&tokenized);
    let rows = tokenized.iter().map(|tokens| vectorizer.vectorize(tokens)).collect();
    (vectorizer, rows)
  }

  fn fit_tokenized(tokenized: &[Vec<String>]) -> Self {
    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for tokens in tokenized {
      let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
      for term in unique {
        *document_frequency.entry(term).or_default() += 1;
      }
    }

    let n = tokenized.len() as f64;
    let mut vocabulary = BTreeMap::new();
    let mut idf = Vec::with_capacity(document_frequency.len());

    // BTreeMap iteration is sorted, so columns follow term order
    for (column, (term, df)) in document_frequency.into_iter().enumerate() {
      vocabulary.insert(term.to_string(), column);
      idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
    }

    Self { vocabulary, idf }
  }

  /// Vectorize unseen text; terms outside the vocabulary are ignored
  pub fn transform(&self, text: &str) -> SparseVector {
    self.vectorize(&tokenize(text))
  }

  fn vectorize(&self, tokens: &[String]) -> SparseVector {
    let mut counts: HashMap<usize, f64> = HashMap::new();
    for token in tokens {
      if let Some(&column) = self.vocabulary.get(token) {
        *counts.entry(column).or_default() += 1.0;
      }
    }

    let mut weighted: Vec<(usize, f64)> =
      counts.into_iter().map(|(column, tf)| (column, tf * self.idf[column])).collect();
    weighted.sort_by_key(|(column, _)| *column);

    let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
      for (_, w) in &mut weighted {
        *w /= norm;
      }
    }

    let (indices, values) = weighted.into_iter().unzip();
    SparseVector { indices, values }
  }

  pub fn vocabulary_size(&self) -> usize {
    self.idf.len()
  }

  pub fn column_of(&self, term: &str) -> Option<usize> {
    self.vocabulary.get(term).copied()
  }

  pub fn idf(&self, term: &str) -> Option<f64> {
    self.column_of(term).map(|column| self.idf[column])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
  }

  #[test]
  fn test_vocabulary_is_sorted_and_stop_words_removed() {
    let vectorizer = TfidfVectorizer::fit(&["pizza and pasta", "the best biryani"]);

    assert_eq!(vectorizer.vocabulary_size(), 4);
    assert_eq!(vectorizer.column_of("best"), Some(0));
    assert_eq!(vectorizer.column_of("biryani"), Some(1));
    assert_eq!(vectorizer.column_of("pasta"), Some(2));
    assert_eq!(vectorizer.column_of("pizza"), Some(3));
    assert_eq!(vectorizer.column_of("the"), None);
  }

  #[test]
  fn test_smoothed_idf() {
    let vectorizer = TfidfVectorizer::fit(&["pizza pasta", "pizza", "curry"]);

    // n = 3; pizza appears in 2 documents, pasta in 1
    assert!(approx(vectorizer.idf("pizza").unwrap(), (4.0f64 / 3.0).ln() + 1.0));
    assert!(approx(vectorizer.idf("pasta").unwrap(), 2.0f64.ln() + 1.0));
  }

  #[test]
  fn test_rows_are_unit_length() {
    let (_, rows) = TfidfVectorizer::fit_transform(&["pizza pizza pasta", "curry naan", ""]);

    assert!(approx(rows[0].norm(), 1.0));
    assert!(approx(rows[1].norm(), 1.0));
    assert!(rows[2].is_empty());
  }

  #[test]
  fn test_term_counts_are_raw() {
    let (vectorizer, rows) = TfidfVectorizer::fit_transform(&["pizza pizza pasta", "pizza"]);

    let pizza = vectorizer.column_of("pizza").unwrap();
    let pasta = vectorizer.column_of("pasta").unwrap();
    let row = &rows[0];
    let weight = |column| row.values[row.indices.iter().position(|&c| c == column).unwrap()];

    let expected_ratio = 2.0 * vectorizer.idf("pizza").unwrap() / vectorizer.idf("pasta").unwrap();
    assert!(approx(weight(pizza) / weight(pasta), expected_ratio));
  }

  #[test]
  fn test_transform_ignores_unknown_terms() {
    let vectorizer = TfidfVectorizer::fit(&["pizza pasta"]);
    let vector = vectorizer.transform("pizza sushi ramen");

    assert_eq!(vector.nnz(), 1);
    assert_eq!(vector.indices, vec![vectorizer.column_of("pizza").unwrap()]);
    assert!(vectorizer.transform("sushi").is_empty());
  }

  #[test]
  fn test_cosine_similarity() {
    let documents = ["italian pizza pasta", "italian pizza pasta", "chinese dumplings"];
    let (_, rows) = TfidfVectorizer::fit_transform(&documents);

    assert!(approx(cosine_similarity(&rows[0], &rows[1]), 1.0));
    assert!(approx(cosine_similarity(&rows[0], &rows[2]), 0.0));
    assert_eq!(cosine_similarity(&rows[0], &SparseVector::default()), 0.0);
  }

  #[test]
  fn test_partial_overlap_is_between_zero_and_one() {
    let (_, rows) = TfidfVectorizer::fit_transform(&["italian pizza", "italian pasta"]);
    let similarity = cosine_similarity(&rows[0], &rows[1]);
    assert!(similarity > 0.0 && similarity < 1.0, "got {similarity}");
  }
}
