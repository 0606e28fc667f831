// Command line entry point: runs one search or baseline quote and prints JSON.

use std::{fs, path::{Path, PathBuf}, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stopover_search::{
    quote_baseline, AppConfig, BaselineRequest, FareClient, ResilientClient, SearchRequest,
    StopoverSearch, SystemClock,
};

#[derive(Parser)]
#[command(name = "stopover", about = "Find the cheapest stopover itinerary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a stopover search from a JSON request file
    Search { request: PathBuf },
    /// Price the plain round trip for a JSON request file
    Baseline { request: PathBuf },
    /// Show which provider environment and credentials are configured
    Health,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let output = match cli.command {
        Command::Health => serde_json::to_string_pretty(&config.health())?,
        Command::Search { request } => {
            let request = SearchRequest::from_json(&read(&request)?)?;
            let pricer = FareClient::new(
                ResilientClient::default(),
                config.provider.clone(),
                Arc::new(SystemClock),
            );
            let search = StopoverSearch::new(pricer, config.search.clone());
            let response = search.search(request).await?;

            let stats = search.pricer().http().stats();
            info!(
                results = response.results.len(),
                attempts = stats.attempts,
                retries = stats.retries,
                timeouts = stats.timeouts,
                "search finished"
            );
            serde_json::to_string_pretty(&response)?
        }
        Command::Baseline { request } => {
            let request: BaselineRequest = serde_json::from_str(&read(&request)?)?;
            let pricer = FareClient::new(
                ResilientClient::default(),
                config.provider.clone(),
                Arc::new(SystemClock),
            );
            serde_json::to_string_pretty(&quote_baseline(&pricer, &request).await?)?
        }
    };

    println!("{}", output);
    Ok(())
}
