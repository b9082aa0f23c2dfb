//! farewatch - track and serve the cheapest Tokyo to Singapore/Manila fares
//!
//! Subcommands create the database, run a one-off 30-day scan, print the
//! cheapest fares for a range, or serve them over HTTP.

use std::error::Error;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use farewatch::api;
use farewatch::cache::FareCacheManager;
use farewatch::cli::{parse_range_args, Cli, Command};
use farewatch::config::Config;
use farewatch::provider::AmadeusClient;
use farewatch::refresh::{self, RefreshConfig, RefreshHandle, ScanOutcome};
use farewatch::store::SqliteStore;

#[tokio::main]
async fn main() {
    // Logs go to stderr so that `cheapest` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::from_cli(&cli);

    match cli.command {
        Command::InitDb => {
            SqliteStore::open(&config.db_path)?;
            println!("Database tables created at {}", config.db_path.display());
        }
        Command::Scan => {
            let manager = open_manager(&config).await?;
            let today = Local::now().date_naive();
            if refresh::scan_horizon(&manager, today).await? == ScanOutcome::ProviderUnavailable {
                info!("scan skipped: no provider access token");
            }
        }
        Command::Serve {
            listen,
            refresh_minutes,
        } => {
            let manager = Arc::new(open_manager(&config).await?);
            let refresh =
                RefreshHandle::spawn(manager.clone(), RefreshConfig::from_minutes(refresh_minutes));

            let listener = TcpListener::bind(listen).await?;
            api::serve(listener, api::router(manager)).await?;

            refresh.shutdown().await;
        }
        Command::Cheapest { start, end } => {
            let range = parse_range_args(&start, &end)?;
            let manager = open_manager(&config).await?;
            let results = api::cheapest_for_all(&manager, &range).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

async fn open_manager(
    config: &Config,
) -> Result<FareCacheManager<SqliteStore, AmadeusClient>, Box<dyn Error>> {
    let store = SqliteStore::open(&config.db_path)?;
    info!(db = %config.db_path.display(), "opened fare store");
    let provider =
        AmadeusClient::connect_with_base_url(&config.provider_url, config.credentials.clone())
            .await;
    Ok(FareCacheManager::new(store, provider))
}
