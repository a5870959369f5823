//! Configuration module for the Wing Finder backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for admin endpoints (required in production)
    pub admin_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Path to the static JSON item snapshot, if bundled
    pub snapshot_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_psk = env::var("WINGS_ADMIN_PSK").ok();

        let db_path = env::var("WINGS_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let index_path = env::var("WINGS_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let snapshot_path = env::var("WINGS_SNAPSHOT_PATH").ok().map(PathBuf::from);

        let bind_addr = env::var("WINGS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid WINGS_BIND_ADDR format");

        let log_level = env::var("WINGS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            admin_psk,
            db_path,
            index_path,
            snapshot_path,
            bind_addr,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("WINGS_ADMIN_PSK");
        env::remove_var("WINGS_DB_PATH");
        env::remove_var("WINGS_INDEX_PATH");
        env::remove_var("WINGS_SNAPSHOT_PATH");
        env::remove_var("WINGS_BIND_ADDR");
        env::remove_var("WINGS_LOG_LEVEL");

        let config = Config::from_env();

        assert!(config.admin_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/app.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert!(config.snapshot_path.is_none());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
    }
}
