//! cianparser main entry point
//!
//! This is the command-line interface for the Cian grid crawler.

use anyhow::Context;
use cianparser::config::{load_config_with_hash, Config};
use cianparser::crawler::crawl;
use cianparser::geo::{parse_geojson, partition};
use cianparser::output::{JsonFileSink, OfferSink};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// cianparser: collects every listing inside a polygon
///
/// The polygon is split into map cells small enough for the cluster API, the
/// listing IDs of every cell are collected and deduplicated, and the full
/// listing records are fetched in batches and written to a JSON file.
#[derive(Parser, Debug)]
#[command(name = "cianparser")]
#[command(version)]
#[command(about = "Grid crawler for Cian listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Path to the GeoJSON search area
    #[arg(short = 'f', long, value_name = "GEOJSON", default_value = "polygon.geojson")]
    polygon: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and polygon and show the grid without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("can't load config {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let geojson = std::fs::read_to_string(&cli.polygon)
        .with_context(|| format!("can't read polygon {}", cli.polygon.display()))?;
    let area = parse_geojson(&geojson)
        .with_context(|| format!("can't parse polygon {}", cli.polygon.display()))?;

    if cli.dry_run {
        handle_dry_run(&config, &area, &cli.polygon)
    } else {
        handle_crawl(&config, &area).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cianparser=info,warn"),
            1 => EnvFilter::new("cianparser=debug,info"),
            2 => EnvFilter::new("cianparser=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: partitions the area and shows the settings
fn handle_dry_run(
    config: &Config,
    area: &geo::Geometry<f64>,
    polygon: &Path,
) -> anyhow::Result<()> {
    let cells = partition(area, config.search.max_cell_size_meters)
        .context("can't partition search area")?;

    println!("=== cianparser Dry Run ===\n");

    println!("Search:");
    println!("  Type: {}", config.search.search_type);
    println!("  Filters: {}", config.search.query.len());
    for (key, term) in &config.search.query {
        println!("    * {}: {}", key, serde_json::to_string(term)?);
    }

    println!("\nGrid:");
    println!("  Polygon: {}", polygon.display());
    println!("  Max cell size: {} m", config.search.max_cell_size_meters);
    println!("  Cells: {}", cells.len());

    println!("\nWorkers:");
    println!("  Collect IDs: {}", config.search.max_workers_collect_ids);
    println!("  Collect offers: {}", config.search.max_workers_collect_offers);
    println!("  Offers batch size: {}", config.search.offers_batch_size);

    println!("\nHTTP:");
    println!("  Base URL: {}", config.http.base_url);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Extra headers: {}", config.http.headers.len());

    println!("\nOutput:");
    println!("  Offers: {}", config.output.offers_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would query {} cells", cells.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, area: &geo::Geometry<f64>) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl: search type {}, {} filters",
        config.search.search_type,
        config.search.query.len()
    );

    let offers = match crawl(config, area).await {
        Ok(offers) => offers,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let mut sink = JsonFileSink::new(&config.output.offers_path);
    sink.write_offers(chrono::Utc::now(), &offers)
        .context("can't write offers")?;

    tracing::info!("Crawl completed: {} offers", offers.len());
    Ok(())
}
