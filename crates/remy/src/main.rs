use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use remy::commands::{self, RecommendOptions};
use remy::config::Config;
use remy::prompt::Prompter;
use remy::ranker::Recommender;

#[derive(Parser)]
#[command(name = "remy")]
#[command(about = "Remy - Restaurant Recommendations\n\
  Nearby places ranked by what you want and what you already like")]
#[command(version)]
struct Cli {
  /// Configuration file path
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Recommend restaurants near an address
  Recommend {
    #[command(flatten)]
    options: RecommendOptions,
  },
  /// Build the cached profile index for the catalog
  Index {
    /// Rebuild even when the cache is up to date
    #[arg(short, long)]
    force: bool,
  },
}

fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("remy=debug,info")
    } else {
      EnvFilter::new("remy=info,warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

  match cli.command {
    Commands::Recommend { options } => {
      let geocoder = commands::geocoder_for(&config, &options)?;
      let (recommender, _) = Recommender::load(&config)?;

      let stdin = io::stdin();
      let mut prompter = Prompter::new(stdin.lock(), io::stdout());
      let recommendations =
        commands::recommend(&recommender, &config, &options, &geocoder, &mut prompter).await?;

      commands::print_recommendations(&recommendations, options.format)?;
    }
    Commands::Index { force } => {
      commands::build_index(&config, force)?;
    }
  }

  Ok(())
}
