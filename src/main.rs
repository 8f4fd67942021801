use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;

use era_stats::batch::BatchCoordinator;
use era_stats::catalog::ContractCatalog;
use era_stats::cli::{Cli, Commands, ReportArgs, ReportFormat};
use era_stats::config::Config;
use era_stats::explorer::{http_client, ExplorerClient};
use era_stats::price::PriceOracle;
use era_stats::report;
use era_stats::stats::StatsFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Report(args) => {
            run_report(&config, args).await?;
        }
        Commands::Inspect { address } => {
            let catalog = Arc::new(ContractCatalog::load(&config.contracts_path)?);
            let (explorer, oracle) = build_clients(&config)?;
            let fetcher = StatsFetcher::new(explorer, oracle, catalog);
            let stats = fetcher.address_stats(address.trim()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Price { symbol } => {
            let client = http_client(Duration::from_secs(config.request_timeout_secs))?;
            let oracle = PriceOracle::new(client, &config.price_api_url)?;
            let price = oracle.usd_price(&symbol).await?;
            println!("{}: ${}", symbol, price);
        }
    }

    Ok(())
}

async fn run_report(config: &Config, args: ReportArgs) -> anyhow::Result<()> {
    let addresses = read_addresses(&args.addresses)?;
    let catalog = Arc::new(ContractCatalog::load(&config.contracts_path)?);
    tracing::info!(
        "loaded {} addresses and {} catalog contracts",
        addresses.len(),
        catalog.len()
    );

    let (explorer, oracle) = build_clients(config)?;
    let fetcher = StatsFetcher::new(explorer, oracle.clone(), Arc::clone(&catalog));

    // One quote per run; the ETH and fee columns share it so rows stay
    // comparable even when the market moves mid-run.
    let eth_price = oracle.usd_price("ETH").await?;
    tracing::info!("ETH quoted at ${}", eth_price);

    let workers = args.workers.unwrap_or_else(default_workers);
    let coordinator = BatchCoordinator::new(fetcher, workers, args.fail_fast);

    let started = Instant::now();
    let results = coordinator.run(&addresses).await?;
    tracing::info!(
        "collected stats for {} addresses in {:.1}s",
        results.len(),
        started.elapsed().as_secs_f64()
    );

    prepare_output_path(&args.out, args.force)?;
    match args.format {
        ReportFormat::Csv => {
            let table = report::build_table(&addresses, &results, &catalog, eth_price);
            report::write_csv(&table, &args.out)?;
        }
        ReportFormat::Json => {
            report::write_json(&addresses, &results, &args.out)?;
        }
    }
    tracing::info!("report written to {}", args.out.display());

    Ok(())
}

fn build_clients(config: &Config) -> anyhow::Result<(ExplorerClient, PriceOracle)> {
    let client = http_client(Duration::from_secs(config.request_timeout_secs))?;
    let explorer = ExplorerClient::new(client.clone(), &config.explorer_api_url, config.tx_page_limit)?;
    let oracle = PriceOracle::new(client, &config.price_api_url)?;
    Ok((explorer, oracle))
}

fn read_addresses(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read address file {}", path.display()))?;
    let addresses: Vec<String> = raw
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if addresses.is_empty() {
        bail!("address file {} is empty; add one address per line", path.display());
    }
    Ok(addresses)
}

fn prepare_output_path(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "output file {} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
