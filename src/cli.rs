//! Shared plumbing for the CLI binaries.

use crate::config::{load_config, Config};
use crate::ledger::Ledger;
use crate::store::Database;
use std::fs;
use std::path::Path;

/// Load `config.toml`, open the database it points at (creating the parent
/// directory if needed), and open the ledger over it.
pub fn open_ledger_from_config() -> Result<(Config, Ledger), Box<dyn std::error::Error>> {
    let config = load_config()?;

    let db_path = Path::new(&config.database.path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir {:?}: {}", parent, e))?;
        }
    }

    let db = Database::open(&config.database.path)?;
    let ledger = Ledger::open(Box::new(db))?;
    Ok((config, ledger))
}

/// Shorten a hex hash for table display.
pub fn short_hash(hex_str: &str) -> String {
    if hex_str.len() > 16 {
        format!("{}...{}", &hex_str[..8], &hex_str[hex_str.len() - 8..])
    } else {
        hex_str.to_string()
    }
}
