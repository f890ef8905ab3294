use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::tor::DEFAULT_EXIT_LIST_URL;

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_path: String,

    // Server
    pub bind_address: String,
    pub port: u16,

    // Filesystem
    pub client_path: PathBuf,
    pub working_path: PathBuf,

    // Admin API (disabled when unset)
    pub admin_api_token: Option<String>,

    // Node bootstrap
    pub default_language: String,

    // Tor exit list
    pub tor_exit_list_url: String,
    pub exit_nodes_refresh_interval: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Storage
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "whistle-node.db".to_string()),

            // Server
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: match std::env::var("PORT") {
                Ok(port) => port.parse().context("PORT must be a valid port number")?,
                Err(_) => 8082,
            },

            // Filesystem
            client_path: std::env::var("CLIENT_PATH")
                .unwrap_or_else(|_| "client".to_string())
                .into(),
            working_path: std::env::var("WORKING_PATH")
                .unwrap_or_else(|_| "working".to_string())
                .into(),

            // Admin API
            admin_api_token: std::env::var("ADMIN_API_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),

            // Node bootstrap
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),

            // Tor exit list
            tor_exit_list_url: std::env::var("TOR_EXIT_LIST_URL")
                .unwrap_or_else(|_| DEFAULT_EXIT_LIST_URL.to_string()),
            exit_nodes_refresh_interval: std::env::var("EXIT_NODES_REFRESH_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(3600),
        })
    }

    /// Operator-provided static files (custom homepage, logos).
    pub fn static_path(&self) -> PathBuf {
        self.working_path.join("files").join("static")
    }

    /// Shipped application data used to seed new languages.
    pub fn appdata_path(&self) -> PathBuf {
        self.client_path.join("data").join("appdata.json")
    }

    /// Shipped translation files, one `<lang>.json` per locale.
    pub fn l10n_path(&self) -> PathBuf {
        self.client_path.join("l10n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_path: ":memory:".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8082,
            client_path: PathBuf::from("/srv/client"),
            working_path: PathBuf::from("/var/lib/node"),
            admin_api_token: None,
            default_language: "en".to_string(),
            tor_exit_list_url: DEFAULT_EXIT_LIST_URL.to_string(),
            exit_nodes_refresh_interval: 3600,
        }
    }

    #[test]
    fn test_derived_paths() {
        let config = config();
        assert_eq!(config.static_path(), PathBuf::from("/var/lib/node/files/static"));
        assert_eq!(config.appdata_path(), PathBuf::from("/srv/client/data/appdata.json"));
        assert_eq!(config.l10n_path(), PathBuf::from("/srv/client/l10n"));
    }
}
