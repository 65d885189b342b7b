//! Error types for ProofLedger

use std::fmt;

#[derive(Debug, Clone)]
pub enum LedgerError {
    Storage(String),
    NotFound(String),
    Decode(String),
    ProofExhausted,
    StaleHead(String),
    Cancelled,
    InvalidBlock(String),
    IoError(String),
    ConfigError(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::Storage(msg) => write!(f, "Storage error: {}", msg),
            LedgerError::NotFound(msg) => write!(f, "Block not found: {}", msg),
            LedgerError::Decode(msg) => write!(f, "Decode error: {}", msg),
            LedgerError::ProofExhausted => write!(f, "Proof of work nonce space exhausted"),
            LedgerError::StaleHead(msg) => write!(f, "Stale head: {}", msg),
            LedgerError::Cancelled => write!(f, "Mining cancelled"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            LedgerError::IoError(msg) => write!(f, "IO error: {}", msg),
            LedgerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
