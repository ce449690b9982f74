// crates/universality-cli/src/main.rs
//
// CLI entrypoint for the universality tests.
//
// Loads configuration, initializes tracing and dispatches to the correlate,
// similarity and vocab subcommands.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use universality_cli::commands::{self, correlate::CorrelateCmd, similarity::SimilarityCmd, vocab::VocabCmd};
use universality_cli::UniversalityConfig;

/// Measure how universal word-embedding geometries are across corpora.
#[derive(Parser, Debug)]
#[command(
    name = "universality",
    version = "0.1.0",
    about = "Align embedding spaces and measure their dimension-wise correlation"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "universality.toml")]
    config: String,

    /// Seed for the vocabulary shuffle (overrides the config file).
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// L2-normalise vectors after loading.
    #[arg(long, global = true)]
    normalize: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Align one source/target pair and report pre- and post-mapping scores.
    Correlate(CorrelateCmd),

    /// Compare every ordered pair of configured corpora.
    Similarity(SimilarityCmd),

    /// Build or reload a shared vocabulary and print its fingerprint.
    Vocab(VocabCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Configuration is read first so its log level can seed the filter.
    let loaded = UniversalityConfig::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|cfg| cfg.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let mut config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", cli.config);
            cfg
        }
        Err(e) => {
            tracing::warn!("Could not load config from {}: {}. Using defaults.", cli.config, e);
            UniversalityConfig::default()
        }
    };

    // CLI flags override the config file.
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.normalize {
        config.normalize = true;
    }

    match &cli.command {
        Commands::Correlate(cmd) => commands::correlate::run(cmd, &config).await?,
        Commands::Similarity(cmd) => commands::similarity::run(cmd, &config).await?,
        Commands::Vocab(cmd) => commands::vocab::run(cmd, &config).await?,
    }

    Ok(())
}
