//! Runtime configuration
//!
//! Resolved once at startup from the parsed command line (which already
//! folds in environment variables) and passed down explicitly.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::cli::Cli;
use crate::provider::Credentials;

/// Database file name inside the data directory
const DB_FILE_NAME: &str = "flights.db";

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Base URL of the flight-search provider
    pub provider_url: String,
    /// Provider credentials, if both halves were supplied
    pub credentials: Option<Credentials>,
}

impl Config {
    /// Builds the configuration from CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        let credentials = match (&cli.api_key, &cli.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(key.clone(), secret.clone()))
            }
            _ => None,
        };

        Self {
            db_path: cli.db.clone().unwrap_or_else(default_db_path),
            provider_url: cli.provider_url.clone(),
            credentials,
        }
    }
}

/// `<data dir>/farewatch/flights.db`, or `./flights.db` when no home
/// directory can be determined
pub fn default_db_path() -> PathBuf {
    ProjectDirs::from("", "", "farewatch")
        .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_explicit_db_path_wins() {
        let cli = Cli::parse_from(["farewatch", "--db", "/tmp/x.db", "scan"]);
        let config = Config::from_cli(&cli);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let cli = Cli::parse_from(["farewatch", "--api-key", "id", "scan"]);
        assert!(Config::from_cli(&cli).credentials.is_none());

        let cli = Cli::parse_from([
            "farewatch",
            "--api-key",
            "id",
            "--api-secret",
            "secret",
            "scan",
        ]);
        let creds = Config::from_cli(&cli).credentials.unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret, "secret");
    }

    #[test]
    fn test_default_db_path_ends_with_file_name() {
        let path = default_db_path();
        assert!(path.ends_with(DB_FILE_NAME));
    }

    #[test]
    fn test_provider_url_override() {
        let cli = Cli::parse_from([
            "farewatch",
            "--provider-url",
            "http://localhost:4010",
            "scan",
        ]);
        assert_eq!(Config::from_cli(&cli).provider_url, "http://localhost:4010");
    }
}
