//! Configuration management for ProofLedger

use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MinerConfig {
    /// Show a live progress display while mining in the CLI tools.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
    /// Attempts between progress reports.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            show_progress: default_show_progress(),
            progress_interval: default_progress_interval(),
        }
    }
}

fn default_db_path() -> String {
    "./data/ledger.db".to_string()
}

fn default_show_progress() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    crate::pow::DEFAULT_PROGRESS_INTERVAL
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Provide sane defaults when config.toml is absent
        Config {
            database: DatabaseConfig {
                path: default_db_path(),
            },
            miner: MinerConfig::default(),
        }
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.database.path.is_empty() {
        return Err("database.path must be set in config.toml".into());
    }

    if config.miner.progress_interval == 0 {
        return Err("miner.progress_interval must be at least 1".into());
    }

    Ok(config)
}
