//! Agent seed configuration loading from config.toml
//!
//! The agents listed in the configuration file are inserted on startup when no agent with
//! the same email exists yet, so a fresh database has a usable agent directory.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "REALTY_LEDGER_CONFIG";
/// Configuration file used when `REALTY_LEDGER_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    /// Agents to seed
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
}

/// Configuration for a single agent
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AgentSeed {
    /// Full name of the agent
    pub name: String,
    /// Contact email (used to detect already-seeded agents)
    pub email: String,
    /// Contact phone number
    pub phone: String,
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let path_ref = path.as_ref();
    debug!("Loading seed configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the seed configuration named by `REALTY_LEDGER_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: it simply means there is nothing to seed.
pub fn load_default_config() -> Result<SeedConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        debug!("No seed configuration at {}, skipping", path);
        return Ok(SeedConfig::default());
    }
    load_config(path)
}
