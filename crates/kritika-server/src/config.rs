use std::{fs, path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "KRITIKA_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "KRITIKA_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "KRITIKA_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db or similar, default is sqlite://[data-dir]/kritika.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "KRITIKA_DATA_DIR",
        help = "Data directory (database, secrets etc.), default is system default like ~/.local/share/kritika",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "KRITIKA_ACCESS_TOKEN_VALIDITY",
        default_value = "1 hour",
        help = "Validity of access tokens in human friendly format (e.g. 1d, 1h, 15m - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub access_token_validity: Duration,

    #[arg(
        long,
        env = "KRITIKA_REFRESH_TOKEN_VALIDITY",
        default_value = "7 days",
        help = "Validity of refresh tokens, must exceed the access validity",
        value_parser = humantime::parse_duration
    )]
    pub refresh_token_validity: Duration,

    #[arg(
        long,
        env = "KRITIKA_SENDER_EMAIL",
        default_value = "noreply@localhost",
        help = "Sender address for confirmation emails"
    )]
    pub sender_email: String,

    #[arg(
        long,
        env = "KRITIKA_DEFAULT_PAGE_SIZE",
        default_value = "100",
        help = "Default page size"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "KRITIKA_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("kritika"))
        .unwrap_or_else(|| PathBuf::from("kritika"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory",)
    }

    dir.to_string_lossy().to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/kritika.db", self.data_dir))
    }
}
