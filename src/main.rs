use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketminer::config::Config;
use marketminer::crawler::{BrandSpider, Fetcher, SearchUrlBuilder};
use marketminer::proxy::ProxyPool;
use marketminer::storage::{create_sqlite_repository, ProductRepository, SqliteProductRepository};

#[derive(Parser)]
#[command(
    name = "marketminer",
    version,
    about = "Brand-driven product catalog crawler",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl products for one or more brands
    Crawl {
        /// Brand name to crawl (repeatable)
        #[arg(short, long, required = true)]
        brand: Vec<String>,

        /// Configuration file path (TOML); environment otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Whole-brand attempts before giving up on an unreachable seed
        #[arg(long, default_value = "5")]
        max_attempts: u32,

        /// Delay between whole-brand attempts in seconds
        #[arg(long, default_value = "60")]
        retry_delay_secs: u64,
    },

    /// Print store statistics
    Stats {
        /// Configuration file path (TOML); environment otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Crawl {
            brand,
            config,
            max_attempts,
            retry_delay_secs,
        } => {
            tracing::info!(
                brands = ?brand,
                max_attempts = %max_attempts,
                "Starting crawl command"
            );
            crawl(brand, config, max_attempts, retry_delay_secs).await?;
        }

        Commands::Stats { config } => {
            stats(config)?;
        }
    }

    Ok(())
}

async fn crawl(
    brands: Vec<String>,
    config_path: Option<PathBuf>,
    max_attempts: u32,
    retry_delay_secs: u64,
) -> Result<()> {
    let config = load_config(config_path)?;

    let pool = ProxyPool::from_strings(&config.proxy.endpoints)?;
    tracing::info!(endpoints = pool.len(), "Proxy pool loaded");

    let fetcher = Arc::new(Fetcher::new(&config.crawler, pool)?);
    let repository = create_sqlite_repository(&config.database.sqlite_path)?;
    let url_builder = SearchUrlBuilder::new(&config.crawler.search_base_url)?;
    let spider = BrandSpider::new(
        Arc::clone(&fetcher),
        repository,
        url_builder,
        config.crawler.batch_size,
    );

    let outcomes = spider
        .crawl_many(&brands, max_attempts, Duration::from_secs(retry_delay_secs))
        .await;

    for (brand, outcome) in &outcomes {
        match outcome {
            Ok(summary) if summary.pages_visited == 0 && summary.fetch_failures > 0 => {
                tracing::error!(brand = %brand, attempts = max_attempts, "Brand crawl failed");
            }
            Ok(summary) => {
                tracing::info!(
                    brand = %brand,
                    pages = summary.pages_visited,
                    extracted = summary.products_extracted,
                    incomplete = summary.incomplete_records,
                    persisted = summary.persisted,
                    dropped = summary.dropped,
                    fetch_failures = summary.fetch_failures,
                    "Brand crawl complete"
                );
            }
            Err(e) => {
                tracing::error!(brand = %brand, error = %e, "Brand skipped");
            }
        }
    }

    let cache = fetcher.cache_stats();
    tracing::info!(
        hits = cache.hits,
        misses = cache.misses,
        hit_rate = format!("{:.2}", cache.hit_rate()),
        "Response cache statistics"
    );

    Ok(())
}

fn stats(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let repo = SqliteProductRepository::new(&config.database.sqlite_path)?;

    println!("Brands:   {}", repo.count_brands()?);
    println!("Products: {}", repo.count_products()?);

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("marketminer=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("marketminer=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
