use colored::*;

use crate::catalog::format_price;
use crate::ranker::{Recommendation, Recommendations};

pub const NOTHING_NEARBY: &str = "No restaurants found in your location radius.";
pub const NOTHING_MATCHED: &str = "No restaurants matched your preferences.";
pub const GEOCODE_FAILED: &str = "Could not find coordinates for the given address.";

/// Why there is nothing to show, if the list is empty
pub fn empty_message(recommendations: &Recommendations) -> Option<&'static str> {
  if recommendations.nearby_count == 0 {
    Some(NOTHING_NEARBY)
  } else if recommendations.is_empty() {
    Some(NOTHING_MATCHED)
  } else {
    None
  }
}

/// Render recommendations for the terminal
pub fn render(recommendations: &Recommendations) -> String {
  if let Some(message) = empty_message(recommendations) {
    return message.yellow().to_string();
  }

  let mut out = String::new();
  if let Some(reference) = &recommendations.reference {
    out.push_str(&format!("Because you liked {}:\n\n", reference.cyan()));
  }

  for (rank, recommendation) in recommendations.items.iter().enumerate() {
    out.push_str(&render_one(rank + 1, recommendation));
  }
  out
}

fn render_one(rank: usize, r: &Recommendation) -> String {
  let text = |field: &Option<String>| field.clone().unwrap_or_else(|| "-".to_string());
  let price = r.price_for_two.map(format_price).unwrap_or_else(|| "-".to_string());
  let rating = r.rating.map(|rating| format!("{rating:.1}")).unwrap_or_else(|| "-".to_string());

  let lines = [
    format!(
      "{}. {} {}",
      rank,
      r.name.yellow().bold(),
      format!("({:.1} km)", r.distance_km).dimmed()
    ),
    format!("   Cuisine:    {}", text(&r.cuisine)),
    format!("   Price:      {}", price),
    format!("   Rating:     {}", rating),
    format!("   Dishes:     {}", text(&r.signature_dishes)),
    format!("   Location:   {}", text(&r.location)),
    format!("   Features:   {}", text(&r.special_features)),
    format!(
      "   Score:      {} (similarity {:.2})",
      format!("{:.3}", r.weighted_score).green(),
      r.similarity_score
    ),
  ];

  format!("{}\n\n", lines.join("\n"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn recommendation(name: &str) -> Recommendation {
    Recommendation {
      name: name.to_string(),
      cuisine: Some("Italian".to_string()),
      price_for_two: Some(800.0),
      rating: Some(4.5),
      signature_dishes: None,
      location: Some("Indiranagar".to_string()),
      special_features: None,
      distance_km: 1.25,
      similarity_score: 1.0,
      weighted_score: 0.95,
    }
  }

  #[test]
  fn test_nothing_nearby_message() {
    colored::control::set_override(false);
    assert_eq!(render(&Recommendations::default()), NOTHING_NEARBY);
  }

  #[test]
  fn test_nothing_matched_message() {
    colored::control::set_override(false);
    let empty = Recommendations { nearby_count: 3, ..Default::default() };
    assert_eq!(render(&empty), NOTHING_MATCHED);
  }

  #[test]
  fn test_empty_message() {
    assert_eq!(empty_message(&Recommendations::default()), Some(NOTHING_NEARBY));

    let nothing_matched = Recommendations { nearby_count: 2, ..Default::default() };
    assert_eq!(empty_message(&nothing_matched), Some(NOTHING_MATCHED));

    let found = Recommendations {
      items: vec![recommendation("Pizza Palace")],
      nearby_count: 2,
      reference: None,
    };
    assert_eq!(empty_message(&found), None);
  }

  #[test]
  fn test_render_lists_fields() {
    colored::control::set_override(false);
    let recommendations = Recommendations {
      items: vec![recommendation("Pizza Palace"), recommendation("Pasta Point")],
      nearby_count: 2,
      reference: Some("Trattoria".to_string()),
    };

    let out = render(&recommendations);
    assert!(out.starts_with("Because you liked Trattoria:"));
    assert!(out.contains("1. Pizza Palace (1.2 km)") || out.contains("1. Pizza Palace (1.3 km)"));
    assert!(out.contains("2. Pasta Point"));
    assert!(out.contains("Price:      800"));
    assert!(out.contains("Rating:     4.5"));
    assert!(out.contains("Dishes:     -"));
    assert!(out.contains("Score:      0.950 (similarity 1.00)"));
  }
}
