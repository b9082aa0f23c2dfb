//! Command-line interface parsing for farewatch
//!
//! Every option can also be supplied through the environment, which is how
//! the provider credentials are normally passed in.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::data::{DateRange, DateRangeError};
use crate::provider::amadeus::DEFAULT_BASE_URL;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The `--start`/`--end` pair does not form a valid date range
    #[error("{0}")]
    InvalidDateRange(#[from] DateRangeError),
}

/// farewatch - cheapest Tokyo to Singapore/Manila fares
#[derive(Parser, Debug)]
#[command(name = "farewatch")]
#[command(about = "Tracks the cheapest HND/NRT to SIN/MNL fares and serves them over HTTP")]
#[command(version)]
pub struct Cli {
    /// SQLite database file (defaults to the user data directory)
    #[arg(long, global = true, env = "FAREWATCH_DB", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Base URL of the flight-search provider
    #[arg(
        long,
        global = true,
        env = "AMADEUS_BASE_URL",
        value_name = "URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub provider_url: String,

    /// Provider API key (OAuth client id)
    #[arg(long, global = true, env = "AMADEUS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Provider API secret (OAuth client secret)
    #[arg(long, global = true, env = "AMADEUS_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the database file and its tables
    InitDb,

    /// Scan the next 30 days for every destination and cache the results
    Scan,

    /// Serve the cheapest-fare JSON API
    Serve {
        /// Address to listen on
        #[arg(long, env = "FAREWATCH_LISTEN", default_value = "127.0.0.1:5000")]
        listen: SocketAddr,

        /// Minutes between background scans; 0 disables them
        #[arg(long, value_name = "MINUTES", default_value_t = 0)]
        refresh_minutes: u64,
    },

    /// Print the cheapest fares for a date range as JSON
    Cheapest {
        /// First departure date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last departure date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
}

/// Parses the `--start`/`--end` arguments of the `cheapest` command
///
/// # Returns
/// * `Ok(DateRange)` if both dates parse and `end >= start`
/// * `Err(CliError::InvalidDateRange)` otherwise
pub fn parse_range_args(start: &str, end: &str) -> Result<DateRange, CliError> {
    Ok(DateRange::parse(start, end)?)
}
