use std::{path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;
use url::Url;
use yamdb_types::config::BackendConfig;

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "YaMDb reviews and ratings API server")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "YAMDB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "YAMDB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "YAMDB_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of server as visible to clients, used for absolute links in listings"
    )]
    pub base_url: Url,

    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        long,
        env = "YAMDB_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Access token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "YAMDB_DEFAULT_PAGE_SIZE",
        default_value = "10",
        value_parser = clap::value_parser!(u32).range(1..=1000),
        help = "Default page size of listings"
    )]
    pub default_page_size: u32,

    #[arg(
        long,
        env = "YAMDB_MAIL_DIR",
        help = "Directory where outgoing mail is stored as .eml files, if not set mail is only logged"
    )]
    pub mail_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "YAMDB_MAIL_FROM",
        default_value = "noreply@yamdb.local",
        help = "Sender address of outgoing mail"
    )]
    pub mail_from: String,

    #[arg(long, env = "YAMDB_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.backend.data_dir()
    }

    pub fn database_url(&self) -> String {
        self.backend.database_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::try_parse_from(["yamdb-server", "--data-dir", "/tmp/yamdb"]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_validity, Duration::from_secs(24 * 3600));
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.database_url(), "sqlite:///tmp/yamdb/yamdb.db");
        assert!(config.mail_dir.is_none());
        assert!(!config.cors);
    }

    #[test]
    fn test_page_size_range() {
        assert!(ServerConfig::try_parse_from([
            "yamdb-server",
            "--default-page-size",
            "0"
        ])
        .is_err());
        let config = ServerConfig::try_parse_from([
            "yamdb-server",
            "--token-validity",
            "1h 30m",
            "--default-page-size",
            "50",
        ])
        .unwrap();
        assert_eq!(config.token_validity, Duration::from_secs(5400));
        assert_eq!(config.default_page_size, 50);
    }
}
