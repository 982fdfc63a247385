use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use colored::*;
use std::io::{BufRead, Write};
use tracing::info;

use crate::catalog::Catalog;
use crate::config::{validate_radius, Config};
use crate::display::{self, GEOCODE_FAILED};
use crate::geocode::{Geocoder, LocationIqGeocoder};
use crate::index::{IndexCache, IndexSource};
use crate::prompt::Prompter;
use crate::ranker::{Query, Recommendations, Recommender};

#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Pretty,
  Json,
}

/// Recommendation request options; anything left out is asked for interactively
#[derive(Debug, Clone, Default, Args)]
pub struct RecommendOptions {
  /// Address to search around
  #[arg(short, long)]
  pub address: Option<String>,
  /// Preferred cuisine (substring, case-insensitive)
  #[arg(short, long)]
  pub cuisine: Option<String>,
  /// Budget for two people
  #[arg(short, long)]
  pub budget: Option<i64>,
  /// Occasion, matched against the restaurant description
  #[arg(short, long)]
  pub occasion: Option<String>,
  /// A restaurant you liked, used to find similar places
  #[arg(short, long)]
  pub liked: Option<String>,
  /// Search radius in kilometres
  #[arg(short, long)]
  pub radius: Option<f64>,
  /// Number of recommendations to show
  #[arg(short, long)]
  pub top: Option<usize>,
  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
  pub format: OutputFormat,
  /// Geocoding API key
  #[arg(long, env = "REMY_GEOCODING_API_KEY", hide_env_values = true)]
  pub api_key: Option<String>,
}

/// Geocoder configured from the command line or the config file
pub fn geocoder_for(config: &Config, options: &RecommendOptions) -> Result<LocationIqGeocoder> {
  let api_key = options
    .api_key
    .clone()
    .or_else(|| config.geocoding_api_key.clone())
    .filter(|key| !key.trim().is_empty())
    .ok_or_else(|| {
      anyhow!(
        "No geocoding API key configured \
         (use --api-key, REMY_GEOCODING_API_KEY or geocoding_api_key)"
      )
    })?;

  LocationIqGeocoder::from_config(config, api_key).context("Failed to create geocoding client")
}

/// Gather the query (flags first, prompts for the rest), geocode the address and rank
pub async fn recommend<G, R, W>(
  recommender: &Recommender,
  config: &Config,
  options: &RecommendOptions,
  geocoder: &G,
  prompter: &mut Prompter<R, W>,
) -> Result<Recommendations>
where
  G: Geocoder + ?Sized,
  R: BufRead,
  W: Write,
{
  let radius_km = options.radius.unwrap_or(config.default_radius_km);
  validate_radius(radius_km)?;
  let top_n = options.top.unwrap_or(config.default_top_n);
  if top_n == 0 {
    return Err(anyhow!("--top must be greater than zero"));
  }

  let address = match &options.address {
    Some(address) => address.clone(),
    None => prompter.ask("Enter your address")?,
  };

  let origin = geocoder.resolve(&address).await.ok_or_else(|| anyhow!(GEOCODE_FAILED))?;
  info!("Resolved '{}' to {}, {}", address, origin.latitude, origin.longitude);

  let cuisine = match &options.cuisine {
    Some(cuisine) => cuisine.clone(),
    None => prompter.ask("Enter preferred cuisine")?,
  };
  let budget = match options.budget {
    Some(budget) => budget,
    None => prompter.ask_integer("Enter your budget for two people")?,
  };
  let occasion = match &options.occasion {
    Some(occasion) => occasion.clone(),
    None => prompter.ask("Enter the occasion")?,
  };
  let liked = match &options.liked {
    Some(liked) => Some(liked.clone()).filter(|l| !l.trim().is_empty()),
    None => prompter.ask_optional("Enter a restaurant you liked (leave blank if none)")?,
  };

  let query = Query { origin, cuisine, budget: budget as f64, occasion, liked, top_n, radius_km };
  Ok(recommender.recommend(&query))
}

/// Print recommendations in the requested format.
///
/// JSON output keeps stdout machine-readable, so the "nothing found" notice goes to stderr.
pub fn print_recommendations(
  recommendations: &Recommendations,
  format: OutputFormat,
) -> Result<()> {
  match format {
    OutputFormat::Pretty => println!("{}", display::render(recommendations)),
    OutputFormat::Json => {
      if let Some(message) = display::empty_message(recommendations) {
        eprintln!("{}", message.yellow());
      }
      println!("{}", serde_json::to_string_pretty(&recommendations.items)?);
    }
  }
  Ok(())
}

/// Build (or rebuild with `force`) the cached profile index
pub fn build_index(config: &Config, force: bool) -> Result<IndexSource> {
  let catalog = Catalog::load(&config.catalog_path)
    .with_context(|| format!("Failed to load catalog {}", config.catalog_path.display()))?;

  let cache = IndexCache::new(&config.cache_dir);
  let (index, source) = cache.load_or_build(&catalog, force)?;

  let status = match &source {
    IndexSource::Cache => "Profile index is up to date".to_string(),
    IndexSource::Built(reason) => format!("Built profile index ({reason})"),
  };
  println!(
    "{} {}: {} restaurants, {} terms in {}",
    "✓".green(),
    status,
    index.len().to_string().cyan(),
    index.vectorizer().vocabulary_size().to_string().cyan(),
    cache.dir().display()
  );

  Ok(source)
}
