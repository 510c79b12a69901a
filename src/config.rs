//! Configuration for the dashboard backend
//!
//! Defaults match a checkout with a `local-data/` directory next to the
//! binary; every field can be overridden from the environment.

use std::path::PathBuf;

pub const DEFAULT_STARTGG_ENDPOINT: &str = "https://api.start.gg/gql/alpha";

#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------
    /// Roster snapshot (JSON array of players)
    pub roster_path: PathBuf,

    /// File holding the start.gg API token
    pub token_path: PathBuf,

    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,

    /// start.gg GraphQL endpoint
    pub startgg_endpoint: String,

    // -------------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------------
    /// Fold repeated tags within one import batch into a single decision
    pub collapse_duplicate_imports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roster_path: PathBuf::from("local-data/players.json"),
            token_path: PathBuf::from("local-data/token.txt"),
            listen_addr: "0.0.0.0:3000".to_string(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            startgg_endpoint: DEFAULT_STARTGG_ENDPOINT.to_string(),
            collapse_duplicate_imports: false,
        }
    }
}

impl Config {
    /// Defaults overridden by process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    ///
    /// Recognized keys: `PORT`, `SLAMBANA_ROSTER_PATH`, `SLAMBANA_TOKEN_PATH`,
    /// `STARTGG_ENDPOINT`, `SLAMBANA_CORS_ORIGINS` (comma-separated),
    /// `SLAMBANA_COLLAPSE_DUPLICATES` (`1`/`true`/`yes`).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(path) = lookup("SLAMBANA_ROSTER_PATH").filter(|p| !p.is_empty()) {
            config.roster_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("SLAMBANA_TOKEN_PATH").filter(|p| !p.is_empty()) {
            config.token_path = PathBuf::from(path);
        }
        if let Some(endpoint) = lookup("STARTGG_ENDPOINT").filter(|e| !e.is_empty()) {
            config.startgg_endpoint = endpoint;
        }
        if let Some(origins) = lookup("SLAMBANA_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(flag) = lookup("SLAMBANA_COLLAPSE_DUPLICATES") {
            config.collapse_duplicate_imports =
                matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config
    }
}
