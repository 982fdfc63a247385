//! Approximate name matching on a 0-100 scale.
//!
//! Scoring follows the usual weighted-ratio recipe: a plain edit-distance
//! ratio, token sorted and token set variants, and best-window partial
//! variants when one string is much longer than the other.

use std::collections::BTreeSet;

/// Match confidence needed before a liked restaurant is trusted
pub const MATCH_THRESHOLD: u8 = 80;

const TOKEN_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.9;
const LONG_PARTIAL_SCALE: f64 = 0.6;

/// Best candidate for a query
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a> {
  pub index: usize,
  pub choice: &'a str,
  pub score: u8,
}

/// Lowercase, turn anything that is not alphanumeric into a space, trim
pub fn normalize(s: &str) -> String {
  s.chars()
    .map(|c| if c.is_alphanumeric() { c.to_lowercase().next().unwrap_or(c) } else { ' ' })
    .collect::<String>()
    .trim()
    .to_string()
}

fn ratio(a: &str, b: &str) -> f64 {
  if a.is_empty() || b.is_empty() {
    return 0.0;
  }
  strsim::normalized_levenshtein(a, b) * 100.0
}

// best ratio of the shorter string against every same-length window of the longer one
fn partial_ratio(a: &str, b: &str) -> f64 {
  let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
  if short.is_empty() {
    return 0.0;
  }

  let long: Vec<char> = long.chars().collect();
  let width = short.chars().count();

  (0..=long.len() - width)
    .map(|start| {
      let window: String = long[start..start + width].iter().collect();
      ratio(short, &window)
    })
    .fold(0.0, f64::max)
}

fn sorted_tokens(s: &str) -> String {
  let mut tokens: Vec<&str> = s.split_whitespace().collect();
  tokens.sort_unstable();
  tokens.join(" ")
}

fn join(a: &str, b: &str) -> String {
  format!("{a} {b}").trim().to_string()
}

fn token_set_score(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
  let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
  let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

  let common = tokens_a.intersection(&tokens_b).copied().collect::<Vec<_>>().join(" ");
  let only_a = tokens_a.difference(&tokens_b).copied().collect::<Vec<_>>().join(" ");
  let only_b = tokens_b.difference(&tokens_a).copied().collect::<Vec<_>>().join(" ");

  let combined_a = join(&common, &only_a);
  let combined_b = join(&common, &only_b);

  [scorer(&common, &combined_a), scorer(&common, &combined_b), scorer(&combined_a, &combined_b)]
    .into_iter()
    .fold(0.0, f64::max)
}

/// Weighted similarity of two strings, 0-100
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
  let a = normalize(a);
  let b = normalize(b);
  if a.is_empty() || b.is_empty() {
    return 0;
  }

  let len_a = a.chars().count() as f64;
  let len_b = b.chars().count() as f64;
  let length_ratio = len_a.max(len_b) / len_a.min(len_b);

  let base = ratio(&a, &b);

  let best = if length_ratio < 1.5 {
    let token_sort = ratio(&sorted_tokens(&a), &sorted_tokens(&b)) * TOKEN_SCALE;
    let token_set = token_set_score(&a, &b, ratio) * TOKEN_SCALE;
    base.max(token_sort).max(token_set)
  } else {
    let scale = if length_ratio <= 8.0 { PARTIAL_SCALE } else { LONG_PARTIAL_SCALE };
    let partial = partial_ratio(&a, &b) * scale;
    let partial_sort =
      partial_ratio(&sorted_tokens(&a), &sorted_tokens(&b)) * TOKEN_SCALE * scale;
    let partial_set = token_set_score(&a, &b, partial_ratio) * TOKEN_SCALE * scale;
    base.max(partial).max(partial_sort).max(partial_set)
  };

  best.round().clamp(0.0, 100.0) as u8
}

/// The first highest-scoring choice for `query`
pub fn extract_one<'a, I>(query: &str, choices: I) -> Option<FuzzyMatch<'a>>
where
  I: IntoIterator<Item = &'a str>,
{
  if normalize(query).is_empty() {
    return None;
  }

  let mut best: Option<FuzzyMatch<'a>> = None;
  for (index, choice) in choices.into_iter().enumerate() {
    let score = weighted_ratio(query, choice);
    if best.as_ref().map_or(true, |b| score > b.score) {
      best = Some(FuzzyMatch { index, choice, score });
    }
  }
  best
}
