//! Configuration module for the clan standings backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the daily snapshot files (`<epoch-ms>.json`)
    pub snapshot_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let snapshot_dir = env::var("CLAN_SNAPSHOT_DIR")
            .unwrap_or_else(|_| "./data/daily".to_string())
            .into();

        let bind_addr = env::var("CLAN_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid CLAN_BIND_ADDR format");

        let log_level = env::var("CLAN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            snapshot_dir,
            bind_addr,
            log_level,
        }
    }
}
